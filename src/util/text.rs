use std::borrow::Cow;

/// Ellipsis appended by [`truncate_chars`]
const ELLIPSIS: &str = "...";

/// Strips control characters from feed-supplied text.
///
/// Feed titles and descriptions occasionally carry stray C0 control bytes
/// (form feeds, NULs, escape sequences pasted from terminals) that break
/// JSON consumers and UI rendering.
///
/// Strips ASCII control chars 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F and 0x7F.
/// Preserves tab, newline and carriage return.
///
/// Returns `Cow::Borrowed` when the input is already clean (the common case).
///
/// # Examples
///
/// ```
/// use jaggregator::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("he\x00llo\x1b"), "hello");
/// assert_eq!(strip_control_chars("line\nbreak"), "line\nbreak");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped_control) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.chars().filter(|c| !is_stripped_control(*c)).collect())
}

fn is_stripped_control(c: char) -> bool {
    c == '\u{7f}' || (c < '\u{20}' && c != '\t' && c != '\n' && c != '\r')
}

/// Collapses every run of whitespace into a single space and trims the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates a string to at most `max_chars` characters, appending "..." when cut.
///
/// Counts Unicode scalar values, so multi-byte text is never split mid-character.
///
/// # Examples
///
/// ```
/// use jaggregator::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("Hello World", 5), "Hello...");
/// assert_eq!(truncate_chars("日本語テキスト", 3), "日本語...");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some((cut, _)) => Cow::Owned(format!("{}{}", s[..cut].trim_end(), ELLIPSIS)),
    }
}

/// Converts a feed entry's HTML description into a short plain-text snippet.
///
/// Tags are removed with `html2text`, whitespace collapsed, control
/// characters stripped and the result bounded to `max_chars`. Input that
/// `html2text` cannot render is used as-is.
///
/// # Examples
///
/// ```
/// use jaggregator::util::html_to_snippet;
///
/// let snippet = html_to_snippet("<p>Breaking <b>news</b> today</p>", 100);
/// assert!(snippet.contains("Breaking"));
/// assert!(!snippet.contains("<b>"));
/// ```
pub fn html_to_snippet(html: &str, max_chars: usize) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let text = if html.contains('<') || html.contains('&') {
        html2text::from_read(html.as_bytes(), 10_000).unwrap_or_else(|_| html.to_string())
    } else {
        html.to_string()
    };

    let collapsed = collapse_whitespace(&strip_control_chars(&text));
    truncate_chars(&collapsed, max_chars).into_owned()
}
