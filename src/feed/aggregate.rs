use crate::feed::classify::{
    audio_mime_for_link, classify, has_audio_extension, is_audio_mime, ClassifyInput, MediaTag,
};
use crate::feed::fetcher::{fetch_feed, FetchError};
use crate::feed::parser::{ParsedEntry, ParsedFeed};
use crate::util::{html_to_snippet, strip_control_chars, MAX_SUMMARY_CHARS};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Title used when an entry has none.
pub const FALLBACK_TITLE: &str = "No title";
/// Source name used when a feed declares no title.
pub const FALLBACK_SOURCE_NAME: &str = "RSS Feed";

/// Errors that fail a whole aggregation call.
///
/// Only caller contract violations end up here; per-feed failures are
/// logged and contribute zero articles instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("feeds must be a non-empty array")]
    EmptyFeedList,
    #[error("feeds must be an array of strings")]
    InvalidFeedList,
}

/// Where an article's audio lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSource {
    pub url: String,
    pub mime_type: String,
}

/// Media kind of an article, fixed when the article is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleKind {
    /// Audio entry. `source` is absent when the entry was flagged as audio by
    /// its wording but carries no playable enclosure or audio link.
    Audio { source: Option<AudioSource> },
    Text,
}

impl ArticleKind {
    pub fn media_tag(&self) -> MediaTag {
        match self {
            ArticleKind::Audio { .. } => MediaTag::Audio,
            ArticleKind::Text => MediaTag::Article,
        }
    }

    pub fn audio_source(&self) -> Option<&AudioSource> {
        match self {
            ArticleKind::Audio { source } => source.as_ref(),
            ArticleKind::Text => None,
        }
    }
}

/// One normalized news or audio item.
///
/// Built once per fetch and never mutated afterwards. `link` is the natural
/// key within an aggregated result set.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub published_at: DateTime<Utc>,
    #[serde(rename = "source")]
    pub source_name: String,
    #[serde(rename = "description")]
    pub summary: String,
    /// Media tag first, then the bias label if any.
    pub tags: Vec<String>,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    #[serde(rename = "audio", serialize_with = "serialize_audio")]
    pub kind: ArticleKind,
    #[serde(rename = "feedUrl")]
    pub feed_url: String,
}

fn serialize_audio<S: Serializer>(kind: &ArticleKind, serializer: S) -> Result<S::Ok, S::Error> {
    kind.audio_source().serialize(serializer)
}

impl Article {
    pub fn media_tag(&self) -> MediaTag {
        self.kind.media_tag()
    }

    pub fn is_audio(&self) -> bool {
        matches!(self.kind, ArticleKind::Audio { .. })
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Normalizes one parsed entry. Returns `None` for entries without a link,
    /// since the link is the article's identity.
    pub fn from_entry(entry: ParsedEntry, source_name: &str, feed_url: &str) -> Option<Self> {
        let link = entry.link.clone()?;

        let title = entry
            .title
            .as_deref()
            .map(|t| strip_control_chars(t).trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());
        let summary = entry
            .summary
            .as_deref()
            .map(|s| html_to_snippet(s, MAX_SUMMARY_CHARS))
            .unwrap_or_default();
        let published_at = entry.published.or(entry.updated).unwrap_or_else(Utc::now);

        let enclosure_mime = entry
            .enclosure
            .as_ref()
            .and_then(|e| e.mime_type.as_deref());
        let classification = classify(&ClassifyInput {
            title: &title,
            summary: &summary,
            link: &link,
            source_name,
            enclosure_mime,
        });

        let kind = match classification.media {
            MediaTag::Article => ArticleKind::Text,
            MediaTag::Audio => ArticleKind::Audio {
                source: audio_source(&entry, &link),
            },
        };

        let mut tags = vec![classification.media.as_str().to_string()];
        if let Some(bias) = classification.bias {
            tags.push(bias.to_string());
        }

        Some(Article {
            title,
            link,
            published_at,
            source_name: source_name.to_string(),
            summary,
            tags,
            thumbnail_url: classification.thumbnail_url,
            kind,
            feed_url: feed_url.to_string(),
        })
    }
}

/// Picks the playable audio for an audio entry: a recognized audio enclosure
/// first, then the entry link itself when it points at an audio file.
fn audio_source(entry: &ParsedEntry, link: &str) -> Option<AudioSource> {
    let from_enclosure = entry.enclosure.as_ref().and_then(|enc| {
        let mime = enc.mime_type.as_deref().filter(|m| is_audio_mime(m))?;
        Some(AudioSource {
            url: enc.url.clone(),
            mime_type: mime.to_string(),
        })
    });

    from_enclosure.or_else(|| {
        has_audio_extension(link).then(|| AudioSource {
            url: link.to_string(),
            mime_type: audio_mime_for_link(link).to_string(),
        })
    })
}

/// Caps applied to one aggregation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateLimits {
    /// Entries taken from each feed, in the order the feed declares them.
    pub per_feed: usize,
    /// Feeds taken from the request; the tail beyond this is dropped.
    pub total_feeds: usize,
}

impl Default for AggregateLimits {
    fn default() -> Self {
        Self {
            per_feed: 10,
            total_feeds: 10,
        }
    }
}

/// Outcome of fetching one feed during an aggregation.
#[derive(Debug)]
pub struct FeedOutcome {
    pub feed_url: String,
    pub result: Result<usize, FetchError>,
}

/// Fetches, normalizes, classifies, deduplicates and sorts articles from a
/// set of feeds.
#[derive(Debug, Clone)]
pub struct Aggregator {
    client: reqwest::Client,
    fetch_timeout: Duration,
}

impl Aggregator {
    pub fn new(client: reqwest::Client, fetch_timeout: Duration) -> Self {
        Self {
            client,
            fetch_timeout,
        }
    }

    /// Aggregates the given feeds into one list, newest first.
    ///
    /// Feeds are fetched concurrently. A feed that fails to download or parse
    /// is logged and contributes nothing; it never fails the call.
    ///
    /// # Errors
    ///
    /// [`AggregateError::EmptyFeedList`] when `feed_urls` is empty.
    pub async fn aggregate(
        &self,
        feed_urls: &[String],
        limits: AggregateLimits,
    ) -> Result<Vec<Article>, AggregateError> {
        self.aggregate_with_outcomes(feed_urls, limits)
            .await
            .map(|(articles, _)| articles)
    }

    /// Like [`Aggregator::aggregate`], also returning the per-feed outcomes in
    /// input order.
    pub async fn aggregate_with_outcomes(
        &self,
        feed_urls: &[String],
        limits: AggregateLimits,
    ) -> Result<(Vec<Article>, Vec<FeedOutcome>), AggregateError> {
        if feed_urls.is_empty() {
            return Err(AggregateError::EmptyFeedList);
        }

        let selected: Vec<String> = feed_urls.iter().take(limits.total_feeds).cloned().collect();
        let feed_count = selected.len();
        if feed_count < feed_urls.len() {
            tracing::debug!(
                requested = feed_urls.len(),
                limit = limits.total_feeds,
                "Feed list truncated to limit"
            );
        }

        let mut fetched: Vec<(usize, String, Result<ParsedFeed, FetchError>)> =
            stream::iter(selected.into_iter().enumerate())
                .map(|(index, url)| {
                    let client = self.client.clone();
                    let timeout = self.fetch_timeout;
                    async move {
                        let result = fetch_feed(&client, &url, timeout).await;
                        (index, url, result)
                    }
                })
                .buffer_unordered(feed_count.max(1))
                .collect()
                .await;

        // Completion order is arbitrary; merge in input order
        fetched.sort_by_key(|(index, _, _)| *index);

        let mut per_feed = Vec::with_capacity(fetched.len());
        let mut outcomes = Vec::with_capacity(fetched.len());
        for (_, feed_url, result) in fetched {
            match result {
                Ok(feed) => {
                    let articles = normalize_feed(feed, &feed_url, limits.per_feed);
                    outcomes.push(FeedOutcome {
                        feed_url,
                        result: Ok(articles.len()),
                    });
                    per_feed.push(articles);
                }
                Err(e) => {
                    tracing::warn!(feed = %feed_url, error = %e, "Failed to fetch feed");
                    outcomes.push(FeedOutcome {
                        feed_url,
                        result: Err(e),
                    });
                }
            }
        }

        let articles = merge(per_feed);
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        tracing::info!(
            feeds = feed_count,
            failed = failed,
            articles = articles.len(),
            "Aggregated feeds"
        );

        Ok((articles, outcomes))
    }
}

/// Turns one parsed feed into articles, keeping at most `limit` entries in
/// the order the feed lists them.
pub fn normalize_feed(feed: ParsedFeed, feed_url: &str, limit: usize) -> Vec<Article> {
    let source_name = feed
        .title
        .as_deref()
        .map(|t| strip_control_chars(t).trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FALLBACK_SOURCE_NAME.to_string());

    let total = feed.entries.len();
    let articles: Vec<Article> = feed
        .entries
        .into_iter()
        .take(limit)
        .filter_map(|entry| Article::from_entry(entry, &source_name, feed_url))
        .collect();

    let skipped = total.min(limit) - articles.len();
    if skipped > 0 {
        tracing::debug!(feed = %feed_url, skipped = skipped, "Entries without a link skipped");
    }

    articles
}

/// Concatenates per-feed lists in order, keeps the first article seen for
/// each link, then sorts newest first. The sort is stable, so equal dates
/// keep their input order.
pub fn merge(per_feed: Vec<Vec<Article>>) -> Vec<Article> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Article> = per_feed
        .into_iter()
        .flatten()
        .filter(|article| seen.insert(article.link.clone()))
        .collect();

    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged
}

/// Extracts the feed list from an untyped request body value.
///
/// # Errors
///
/// - [`AggregateError::InvalidFeedList`] - not an array, or an element is not a string
/// - [`AggregateError::EmptyFeedList`] - missing (`null`) or empty array
pub fn feed_urls_from_json(value: &serde_json::Value) -> Result<Vec<String>, AggregateError> {
    let items = match value {
        serde_json::Value::Null => return Err(AggregateError::EmptyFeedList),
        serde_json::Value::Array(items) => items,
        _ => return Err(AggregateError::InvalidFeedList),
    };

    if items.is_empty() {
        return Err(AggregateError::EmptyFeedList);
    }

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(AggregateError::InvalidFeedList)
        })
        .collect()
}
