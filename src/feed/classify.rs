//! Media-type, bias and thumbnail classification for normalized entries.
//!
//! Everything here is a pure function over strings and a static domain
//! table: no I/O, no allocation beyond the returned values, and no input
//! (however malformed) makes it fail.

use url::Url;

/// Thumbnail used when no logo is known for an entry's domain.
pub const NO_LOGO_THUMBNAIL: &str = "https://via.placeholder.com/40?text=No+Logo";

/// Logo service base; the thumbnail for a known domain is `{base}/{domain}`.
const LOGO_BASE_URL: &str = "https://logo.clearbit.com";

/// Lower-case markers in a title or summary that flag an entry as audio.
const AUDIO_MARKERS: &[&str] = &["podcast", "audio"];

/// File extensions (lower-case, with dot) recognized as audio links.
const AUDIO_EXTENSIONS: &[&str] = &[
    ".mp3", ".m4a", ".aac", ".ogg", ".oga", ".opus", ".wav", ".flac",
];

/// MIME types outside `audio/*` that still carry audio.
const EXTRA_AUDIO_MIME_TYPES: &[&str] = &["application/ogg", "video/mp4a-latm"];

/// Editorial-leaning labels by registrable domain.
///
/// One canonical table: each domain appears exactly once.
const BIAS_TABLE: &[(&str, &str)] = &[
    // Left
    ("nytimes.com", "left"),
    ("cnn.com", "left"),
    ("huffpost.com", "left"),
    ("msnbc.com", "left"),
    ("theguardian.com", "left"),
    ("salon.com", "left"),
    ("buzzfeednews.com", "left"),
    ("vox.com", "left"),
    // Lean left
    ("politico.com", "lean left"),
    ("cbsnews.com", "lean left"),
    ("nbcnews.com", "lean left"),
    ("theatlantic.com", "lean left"),
    ("time.com", "lean left"),
    ("slate.com", "lean left"),
    ("washingtonpost.com", "lean left"),
    // Center
    ("reuters.com", "center"),
    ("apnews.com", "center"),
    ("bbc.com", "center"),
    ("bbc.co.uk", "center"),
    ("npr.org", "center"),
    ("usatoday.com", "center"),
    ("forbes.com", "center"),
    ("aljazeera.com", "center"),
    ("dw.com", "center"),
    ("france24.com", "center"),
    // Lean right
    ("thehill.com", "lean right"),
    ("wsj.com", "lean right"),
    ("nypost.com", "lean right"),
    ("dailycaller.com", "lean right"),
    ("nationalreview.com", "lean right"),
    // Right
    ("breitbart.com", "right"),
    ("foxnews.com", "right"),
    ("gatewaypundit.com", "right"),
    ("thegatewaypundit.com", "right"),
    ("westernjournal.com", "right"),
    ("dailywire.com", "right"),
    ("newsmax.com", "right"),
    // Alternative
    ("infowars.com", "alternative"),
    ("zerohedge.com", "alternative"),
    ("thefederalist.com", "alternative"),
    ("thedailybeast.com", "alternative"),
    ("theblaze.com", "alternative"),
];

/// The media type of an entry. Every article has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaTag {
    Audio,
    Article,
}

impl MediaTag {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaTag::Audio => "audio",
            MediaTag::Article => "article",
        }
    }
}

impl std::fmt::Display for MediaTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields of an entry the classifier looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyInput<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub link: &'a str,
    pub source_name: &'a str,
    /// Declared MIME type of the entry's enclosure, if it has one.
    pub enclosure_mime: Option<&'a str>,
}

/// Result of classifying one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub media: MediaTag,
    pub bias: Option<&'static str>,
    /// Never empty.
    pub thumbnail_url: String,
}

/// Classifies an entry: media tag, optional bias label, thumbnail URL.
///
/// # Examples
///
/// ```
/// use jaggregator::feed::{classify, ClassifyInput, MediaTag, NO_LOGO_THUMBNAIL};
///
/// let c = classify(&ClassifyInput {
///     title: "Weekly podcast",
///     link: "https://www.foxnews.com/show/1",
///     ..Default::default()
/// });
/// assert_eq!(c.media, MediaTag::Audio);
/// assert_eq!(c.bias, Some("right"));
/// assert_eq!(c.thumbnail_url, "https://logo.clearbit.com/foxnews.com");
///
/// let unknown = classify(&ClassifyInput { link: "::not a url::", ..Default::default() });
/// assert_eq!(unknown.media, MediaTag::Article);
/// assert_eq!(unknown.bias, None);
/// assert_eq!(unknown.thumbnail_url, NO_LOGO_THUMBNAIL);
/// ```
pub fn classify(input: &ClassifyInput<'_>) -> Classification {
    let media = media_tag(input);
    let domain = resolve_domain(input.link, input.source_name);
    let known = domain.as_deref().and_then(lookup_domain);

    Classification {
        media,
        bias: known.map(|(_, label)| label),
        thumbnail_url: known
            .map(|(domain, _)| format!("{LOGO_BASE_URL}/{domain}"))
            .unwrap_or_else(|| NO_LOGO_THUMBNAIL.to_string()),
    }
}

/// Determines the media tag of an entry.
pub fn media_tag(input: &ClassifyInput<'_>) -> MediaTag {
    if input.enclosure_mime.is_some_and(is_audio_mime)
        || contains_audio_marker(input.title)
        || contains_audio_marker(input.summary)
        || has_audio_extension(input.link)
    {
        MediaTag::Audio
    } else {
        MediaTag::Article
    }
}

/// Returns true for `audio/*` and the few non-`audio/` types that carry audio.
pub fn is_audio_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or(mime).trim().to_ascii_lowercase();
    essence.starts_with("audio/") || EXTRA_AUDIO_MIME_TYPES.contains(&essence.as_str())
}

/// Returns true when the URL's path ends in a known audio extension.
///
/// Query strings and fragments are ignored; unparsable input is checked as
/// a plain string.
pub fn has_audio_extension(link: &str) -> bool {
    let path = match Url::parse(link.trim()) {
        Ok(url) => url.path().to_ascii_lowercase(),
        Err(_) => link
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase(),
    };
    AUDIO_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Guesses a MIME type for an audio link from its extension.
pub fn audio_mime_for_link(link: &str) -> &'static str {
    let lower = link.split(['?', '#']).next().unwrap_or_default().to_ascii_lowercase();
    if lower.ends_with(".m4a") || lower.ends_with(".aac") {
        "audio/mp4"
    } else if lower.ends_with(".ogg") || lower.ends_with(".oga") || lower.ends_with(".opus") {
        "audio/ogg"
    } else if lower.ends_with(".wav") {
        "audio/wav"
    } else if lower.ends_with(".flac") {
        "audio/flac"
    } else {
        "audio/mpeg"
    }
}

fn contains_audio_marker(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    AUDIO_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Resolves the domain used for table lookups.
///
/// The link's host with a leading `www.` stripped; when the link does not
/// parse or has no host, the lower-cased source name instead.
pub fn resolve_domain(link: &str, source_name: &str) -> Option<String> {
    let from_link = Url::parse(link.trim())
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .filter(|host| !host.is_empty());

    let domain = match from_link {
        Some(host) => host,
        None => source_name.trim().to_lowercase(),
    };

    let domain = domain.strip_prefix("www.").unwrap_or(&domain);
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_string())
    }
}

/// Looks a domain up in the bias table, walking up through parent domains
/// (`rss.cnn.com` → `cnn.com`). Single-label suffixes are never matched.
fn lookup_domain(domain: &str) -> Option<(&'static str, &'static str)> {
    let mut candidate = domain;
    loop {
        if let Some(entry) = BIAS_TABLE.iter().find(|(d, _)| *d == candidate) {
            return Some(*entry);
        }
        match candidate.split_once('.') {
            Some((_, parent)) if parent.contains('.') => candidate = parent,
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn input<'a>(title: &'a str, link: &'a str) -> ClassifyInput<'a> {
        ClassifyInput {
            title,
            link,
            ..Default::default()
        }
    }

    #[test]
    fn test_bias_table_has_unique_domains() {
        let mut seen = HashSet::new();
        for (domain, _) in BIAS_TABLE {
            assert!(seen.insert(*domain), "duplicate domain in table: {domain}");
        }
    }

    #[test]
    fn test_audio_by_enclosure_mime() {
        let c = classify(&ClassifyInput {
            title: "Plain title",
            link: "https://example.com/story",
            enclosure_mime: Some("audio/mpeg"),
            ..Default::default()
        });
        assert_eq!(c.media, MediaTag::Audio);
    }

    #[test]
    fn test_non_audio_enclosure_is_article() {
        let c = classify(&ClassifyInput {
            title: "Photo essay",
            link: "https://example.com/story",
            enclosure_mime: Some("image/jpeg"),
            ..Default::default()
        });
        assert_eq!(c.media, MediaTag::Article);
    }

    #[test]
    fn test_audio_by_markers() {
        assert_eq!(media_tag(&input("The Daily Podcast", "")), MediaTag::Audio);
        let by_summary = ClassifyInput {
            summary: "Listen to the AUDIO version",
            ..Default::default()
        };
        assert_eq!(media_tag(&by_summary), MediaTag::Audio);
    }

    #[test]
    fn test_audio_by_extension_ignores_query() {
        assert!(has_audio_extension("https://cdn.example.com/ep.MP3?token=abc"));
        assert!(has_audio_extension("https://cdn.example.com/ep.m4a#t=10"));
        assert!(!has_audio_extension("https://example.com/mp3-players-reviewed"));
        assert!(has_audio_extension("not a url/clip.ogg"));
    }

    #[test]
    fn test_audio_mime_recognition() {
        assert!(is_audio_mime("audio/mpeg"));
        assert!(is_audio_mime("Audio/X-M4A; charset=binary"));
        assert!(is_audio_mime("application/ogg"));
        assert!(!is_audio_mime("video/mp4"));
        assert!(!is_audio_mime(""));
    }

    #[test]
    fn test_audio_mime_for_link() {
        assert_eq!(audio_mime_for_link("https://x/a.mp3"), "audio/mpeg");
        assert_eq!(audio_mime_for_link("https://x/a.M4A?x=1"), "audio/mp4");
        assert_eq!(audio_mime_for_link("https://x/a.opus"), "audio/ogg");
    }

    #[test]
    fn test_www_stripped_for_bias_and_thumbnail() {
        let c = classify(&input("Story", "https://www.cnn.com/2024/01/01/story"));
        assert_eq!(c.media, MediaTag::Article);
        assert_eq!(c.bias, Some("left"));
        assert_eq!(c.thumbnail_url, "https://logo.clearbit.com/cnn.com");
    }

    #[test]
    fn test_subdomain_resolves_to_registrable_domain() {
        let c = classify(&input("Story", "https://rss.nytimes.com/services/xml"));
        assert_eq!(c.bias, Some("left"));
        assert_eq!(c.thumbnail_url, "https://logo.clearbit.com/nytimes.com");
    }

    #[test]
    fn test_unknown_domain_gets_fallback_thumbnail() {
        let c = classify(&input("Story", "https://blog.example.net/post"));
        assert_eq!(c.bias, None);
        assert_eq!(c.thumbnail_url, NO_LOGO_THUMBNAIL);
    }

    #[test]
    fn test_malformed_link_falls_back_to_source_name() {
        let c = classify(&ClassifyInput {
            title: "Story",
            link: "not a url at all",
            source_name: "  NPR.org ",
            ..Default::default()
        });
        assert_eq!(c.bias, Some("center"));
        assert_eq!(c.thumbnail_url, "https://logo.clearbit.com/npr.org");
    }

    #[test]
    fn test_malformed_link_without_source_name() {
        let c = classify(&input("Story", "%%%"));
        assert_eq!(c.bias, None);
        assert_eq!(c.thumbnail_url, NO_LOGO_THUMBNAIL);
    }

    #[test]
    fn test_single_label_suffix_never_matches() {
        assert_eq!(lookup_domain("com"), None);
        assert_eq!(lookup_domain("evil.com"), None);
        assert_eq!(lookup_domain("a.b.cnn.com"), Some(("cnn.com", "left")));
    }

    #[test]
    fn test_resolve_domain() {
        assert_eq!(
            resolve_domain("https://WWW.Example.COM/a", ""),
            Some("example.com".to_string())
        );
        assert_eq!(resolve_domain("", "Some Feed"), Some("some feed".to_string()));
        assert_eq!(resolve_domain("", "   "), None);
    }

    proptest! {
        #[test]
        fn classify_is_total(
            title in ".*",
            summary in ".*",
            link in ".*",
            source in ".*",
        ) {
            let c = classify(&ClassifyInput {
                title: &title,
                summary: &summary,
                link: &link,
                source_name: &source,
                enclosure_mime: None,
            });
            prop_assert!(!c.thumbnail_url.is_empty());
        }

        #[test]
        fn audio_enclosure_always_audio(title in ".*", link in ".*", subtype in "[a-z0-9.+-]{1,12}") {
            let mime = format!("audio/{subtype}");
            let c = classify(&ClassifyInput {
                title: &title,
                link: &link,
                enclosure_mime: Some(&mime),
                ..Default::default()
            });
            prop_assert_eq!(c.media, MediaTag::Audio);
        }
    }
}
