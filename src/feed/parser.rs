use crate::feed::classify::is_audio_mime;
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Link};
use feed_rs::parser;

/// A media file attached to a feed entry (RSS `<enclosure>`, Atom
/// `rel="enclosure"` link, or Media RSS content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    /// Declared MIME type, lower-cased, without parameters.
    pub mime_type: Option<String>,
}

/// One entry of a parsed feed, before normalization into an article.
#[derive(Debug, Clone, Default)]
pub struct ParsedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// Raw description or content body, possibly HTML.
    pub summary: Option<String>,
    pub enclosure: Option<Enclosure>,
}

/// A parsed RSS/Atom document. Entries keep the order the feed declares.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

/// Parses RSS 0.9x/1.0/2.0, Atom or JSON Feed bytes.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let title = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty());

    let entries = feed.entries.into_iter().map(parse_entry).collect();

    Ok(ParsedFeed { title, entries })
}

fn parse_entry(entry: Entry) -> ParsedEntry {
    let link = primary_link(&entry.links).map(|l| l.href.trim().to_string());
    let enclosure = find_enclosure(&entry);
    let summary = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .filter(|s| !s.trim().is_empty());
    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty());

    ParsedEntry {
        title,
        link: link.filter(|l| !l.is_empty()),
        published: entry.published,
        updated: entry.updated,
        summary,
        enclosure,
    }
}

/// The entry's page link: the first `alternate` (or rel-less) link, else the
/// first link that is not an enclosure.
fn primary_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.iter().find(|l| l.rel.as_deref() != Some("enclosure")))
}

/// Picks the entry's playable attachment: the first audio-typed candidate
/// among `media:content` and enclosure links, else the first candidate.
fn find_enclosure(entry: &Entry) -> Option<Enclosure> {
    let from_media = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|content| {
            let url = content.url.as_ref()?;
            Some(Enclosure {
                url: url.to_string(),
                mime_type: content
                    .content_type
                    .as_ref()
                    .map(|m| m.essence().to_string().to_ascii_lowercase()),
            })
        });
    let from_links = entry
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("enclosure"))
        .map(|l| Enclosure {
            url: l.href.trim().to_string(),
            mime_type: l.media_type.as_deref().map(normalize_mime),
        });

    let candidates: Vec<Enclosure> = from_media.chain(from_links).collect();
    let audio = candidates
        .iter()
        .position(|e| e.mime_type.as_deref().is_some_and(is_audio_mime));

    candidates.into_iter().nth(audio.unwrap_or(0))
}

fn normalize_mime(raw: &str) -> String {
    raw.split(';').next().unwrap_or(raw).trim().to_ascii_lowercase()
}
