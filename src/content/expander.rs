use crate::content::PLACEHOLDER_HTML;
use crate::content::readability::{extract_readable_content, ReadableContent};
use crate::feed::aggregate::FALLBACK_TITLE;
use crate::util::parse_http_url;
use futures::StreamExt;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

const MAX_PAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Invalid article URL: {0}")]
    InvalidUrl(String),
    #[error("Upstream returned status {0}")]
    Upstream(u16),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("No readable content found")]
    Extraction,
}

impl ContentError {
    /// True when the page could not be retrieved, as opposed to retrieved
    /// but not understood.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ContentError::Upstream(_)
                | ContentError::Network(_)
                | ContentError::Timeout
                | ContentError::ResponseTooLarge(_)
        )
    }
}

/// A fully expanded article, as shown in the reader view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedArticle {
    pub title: String,
    #[serde(rename = "content")]
    pub html: String,
    #[serde(rename = "text")]
    pub plain_text: String,
}

/// Fetches article pages and extracts their readable content.
///
/// Successful extractions are cached by link in a bounded LRU; failures are
/// never cached, so a later call retries the page.
pub struct ContentExpander {
    client: reqwest::Client,
    timeout: Duration,
    cache: Option<Mutex<LruCache<String, Arc<ReadableContent>>>>,
}

impl ContentExpander {
    /// Creates an expander. A `cache_capacity` of zero disables caching.
    pub fn new(client: reqwest::Client, timeout: Duration, cache_capacity: usize) -> Self {
        Self {
            client,
            timeout,
            cache: NonZeroUsize::new(cache_capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Retrieves `link` and returns its readable content.
    ///
    /// The page's own title wins; `fallback_title` (usually the feed entry's
    /// title) is used when the page has none.
    ///
    /// # Errors
    ///
    /// - [`ContentError::InvalidUrl`] - not an absolute http(s) URL
    /// - [`ContentError::Upstream`] - non-2xx response
    /// - [`ContentError::Network`] / [`ContentError::Timeout`] /
    ///   [`ContentError::ResponseTooLarge`] - retrieval failed
    /// - [`ContentError::Extraction`] - page has no readable content
    pub async fn expand(
        &self,
        link: &str,
        fallback_title: Option<&str>,
    ) -> Result<ExpandedArticle, ContentError> {
        let url = parse_http_url(link).map_err(|e| ContentError::InvalidUrl(e.to_string()))?;
        let key = url.to_string();

        let content = match self.cached(&key) {
            Some(content) => {
                tracing::debug!(url = %key, "Article content cache hit");
                content
            }
            None => {
                let html = tokio::time::timeout(self.timeout, self.fetch_page(url.as_str()))
                    .await
                    .map_err(|_| ContentError::Timeout)??;
                let content =
                    extract_readable_content(&html, &url).ok_or(ContentError::Extraction)?;
                let content = Arc::new(content);
                self.store(key, Arc::clone(&content));
                content
            }
        };

        let title = content
            .title
            .clone()
            .or_else(|| {
                fallback_title
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());

        let html = if content.html.trim().is_empty() {
            PLACEHOLDER_HTML.to_string()
        } else {
            content.html.clone()
        };

        Ok(ExpandedArticle {
            title,
            html,
            plain_text: content.text.clone(),
        })
    }

    /// Number of cached pages.
    pub fn cached_len(&self) -> usize {
        self.cache
            .as_ref()
            .map(|c| c.lock().unwrap_or_else(|e| e.into_inner()).len())
            .unwrap_or(0)
    }

    fn cached(&self, key: &str) -> Option<Arc<ReadableContent>> {
        let cache = self.cache.as_ref()?;
        let mut guard = cache.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    fn store(&self, key: String, content: Arc<ReadableContent>) {
        if let Some(cache) = &self.cache {
            cache
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .put(key, content);
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String, ContentError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ContentError::Upstream(response.status().as_u16()));
        }

        read_limited_text(response, MAX_PAGE_SIZE).await
    }
}

async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, ContentError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(ContentError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ContentError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    // Pages with stray invalid bytes are still worth extracting
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
