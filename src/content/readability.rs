//! Readability extraction of an article's main content.
//!
//! The heavy lifting (candidate scoring, clutter removal, resolving image and
//! link paths against the page URL) is done by the `readability` crate. This
//! module tidies its output and rejects pages with too little text to be an
//! article.

use crate::util::collapse_whitespace;
use std::io::Cursor;
use url::Url;

/// Minimum amount of text (in characters) for a page to count as an article.
const MIN_CONTENT_LEN: usize = 200;

/// The readable part of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadableContent {
    /// Page title, if the page declares one.
    pub title: Option<String>,
    /// HTML of the main content.
    pub html: String,
    /// Plain text with paragraphs separated by blank lines.
    pub text: String,
}

/// Extracts the main content of `html`, resolving relative paths against
/// `base_url`.
///
/// Returns `None` when extraction fails or the result carries too little text
/// to be an article.
///
/// # Examples
///
/// ```
/// use jaggregator::content::extract_readable_content;
/// use url::Url;
///
/// let body = "A sentence long enough to look like real prose. ".repeat(10);
/// let page = format!(
///     "<html><head><title>Hello</title></head><body><article><p>{body}</p></article></body></html>"
/// );
/// let base = Url::parse("https://example.com/post/1").unwrap();
///
/// let content = extract_readable_content(&page, &base).unwrap();
/// assert_eq!(content.title.as_deref(), Some("Hello"));
/// assert!(content.text.contains("real prose"));
/// ```
pub fn extract_readable_content(html: &str, base_url: &Url) -> Option<ReadableContent> {
    let mut reader = Cursor::new(html.as_bytes());
    let product = match ::readability::extractor::extract(&mut reader, base_url) {
        Ok(product) => product,
        Err(e) => {
            tracing::debug!(url = %base_url, error = %e, "Readability extraction failed");
            return None;
        }
    };

    let text = tidy_text(&product.text);
    if text.chars().count() < MIN_CONTENT_LEN {
        tracing::debug!(url = %base_url, chars = text.chars().count(), "No readable content found");
        return None;
    }

    let title = Some(collapse_whitespace(&product.title)).filter(|t| !t.is_empty());

    Some(ReadableContent {
        title,
        html: product.content.trim().to_string(),
        text,
    })
}

/// Collapses whitespace inside each line and joins the non-empty lines as
/// paragraphs.
fn tidy_text(raw: &str) -> String {
    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
