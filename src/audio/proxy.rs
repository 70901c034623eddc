use crate::audio::cache::{AudioCache, CacheEntry};
use crate::audio::range::parse_range;
use crate::util::parse_http_url;
use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Content type assumed when neither the cache nor the origin declares one.
pub const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

/// Hop-by-hop headers never copied from the origin to the client.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum ProxyError {
    /// No `url` query parameter
    #[error("Missing url parameter")]
    MissingUrl,
    /// Percent-decoding produced invalid UTF-8
    #[error("url parameter is not valid percent-encoded UTF-8")]
    InvalidEncoding,
    /// Decoded value is not an absolute http(s) URL
    #[error("Invalid audio URL: {0}")]
    InvalidUrl(String),
    /// Origin could not be reached before any byte was sent
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl ProxyError {
    /// True for errors caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ProxyError::Upstream(_))
    }
}

/// Extracts and decodes the `url` parameter from a raw query string.
///
/// The value is percent-decoded exactly once, so an audio URL carrying its
/// own query string survives when the client encoded it as a whole.
///
/// # Examples
///
/// ```
/// use jaggregator::audio::target_from_query;
///
/// let url = target_from_query(Some("url=https%3A%2F%2Fcdn.example.com%2Fa.mp3%3Fk%3D1")).unwrap();
/// assert_eq!(url.as_str(), "https://cdn.example.com/a.mp3?k=1");
/// assert!(target_from_query(None).is_err());
/// ```
pub fn target_from_query(raw_query: Option<&str>) -> Result<Url, ProxyError> {
    let raw = raw_query
        .unwrap_or_default()
        .split('&')
        .find_map(|pair| pair.strip_prefix("url="))
        .filter(|v| !v.is_empty())
        .ok_or(ProxyError::MissingUrl)?;

    let decoded = urlencoding::decode(raw).map_err(|_| ProxyError::InvalidEncoding)?;
    parse_http_url(&decoded).map_err(|e| ProxyError::InvalidUrl(e.to_string()))
}

/// Range-aware audio relay with a small-file cache.
///
/// A request is served from the cache when a live entry exists. Otherwise it
/// goes to the origin with the client's `Range` forwarded, and the origin's
/// status and headers are relayed. Complete `200` bodies small enough for the
/// cache are recorded while they stream and committed only once the last
/// byte has arrived.
#[derive(Debug, Clone)]
pub struct AudioProxy {
    client: reqwest::Client,
    cache: Arc<AudioCache>,
}

impl AudioProxy {
    pub fn new(client: reqwest::Client, cache: Arc<AudioCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<AudioCache> {
        &self.cache
    }

    /// Serves one proxy request.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::MissingUrl`] / [`ProxyError::InvalidEncoding`] /
    ///   [`ProxyError::InvalidUrl`] - bad `url` parameter
    /// - [`ProxyError::Upstream`] - the origin failed before a response began;
    ///   failures after that abort the body stream instead
    pub async fn serve(
        &self,
        raw_query: Option<&str>,
        range: Option<&str>,
    ) -> Result<Response, ProxyError> {
        let url = target_from_query(raw_query)?;
        let key = url.to_string();

        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!(url = %key, range = ?range, "Audio cache hit");
            return Ok(respond_from_cache(&entry, range));
        }

        tracing::debug!(url = %key, range = ?range, "Audio cache miss");
        self.relay(url, key, range).await
    }

    async fn relay(&self, url: Url, key: String, range: Option<&str>) -> Result<Response, ProxyError> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        let upstream = request.send().await.inspect_err(|e| {
            tracing::warn!(url = %key, error = %e, "Audio upstream request failed");
        })?;

        let status = upstream.status();
        let mut headers = forwarded_headers(upstream.headers());
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            );
        }

        let cacheable_len = upstream
            .content_length()
            .filter(|len| status == StatusCode::OK && self.cache.admits(*len));

        let body = match cacheable_len {
            Some(expected) => {
                tracing::debug!(url = %key, bytes = expected, "Buffering audio for cache");
                let recorder = Recorder {
                    stream: upstream
                        .bytes_stream()
                        .map(|chunk| chunk.map_err(std::io::Error::other))
                        .boxed(),
                    buffer: BytesMut::with_capacity(expected as usize),
                    expected,
                    cache: Arc::clone(&self.cache),
                    key,
                    content_type,
                };
                Body::from_stream(recorder.into_stream())
            }
            None => {
                let stream = upstream.bytes_stream().map(move |chunk| {
                    chunk.map_err(|e| {
                        tracing::warn!(url = %key, error = %e, "Audio stream aborted");
                        e
                    })
                });
                Body::from_stream(stream)
            }
        };

        Ok((status, headers, body).into_response())
    }
}

/// Streams origin chunks to the client while keeping a copy for the cache.
struct Recorder {
    stream: BoxStream<'static, std::io::Result<Bytes>>,
    buffer: BytesMut,
    expected: u64,
    cache: Arc<AudioCache>,
    key: String,
    content_type: String,
}

impl Recorder {
    fn into_stream(self) -> impl futures::Stream<Item = std::io::Result<Bytes>> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut state = state?;
            match state.stream.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    Some((Ok(chunk), Some(state)))
                }
                Some(Err(e)) => {
                    tracing::warn!(url = %state.key, error = %e, "Audio stream aborted, not caching");
                    Some((Err(e), None))
                }
                None => {
                    state.commit();
                    None
                }
            }
        })
    }

    fn commit(self) {
        let received = self.buffer.len() as u64;
        if received != self.expected {
            tracing::warn!(
                url = %self.key,
                expected = self.expected,
                received = received,
                "Audio body length mismatch, not caching"
            );
            return;
        }

        tracing::debug!(url = %self.key, bytes = received, "Audio cached");
        self.cache
            .put(self.key, self.buffer.freeze(), self.content_type);
    }
}

fn forwarded_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

fn respond_from_cache(entry: &CacheEntry, range: Option<&str>) -> Response {
    let total = entry.total_len();
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&entry.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );

    match range.and_then(|r| parse_range(r, total)) {
        Some(r) => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(r.byte_count()));
            if let Ok(value) = HeaderValue::from_str(&r.content_range(total)) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            let slice = entry.bytes.slice(r.start as usize..=r.end as usize);
            (StatusCode::PARTIAL_CONTENT, headers, Body::from(slice)).into_response()
        }
        None => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(total));
            (StatusCode::OK, headers, Body::from(entry.bytes.clone())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_target_decoded_once() {
        let url = target_from_query(Some("url=https%3A%2F%2Fa.com%2Fx%2520y.mp3")).unwrap();
        assert_eq!(url.as_str(), "https://a.com/x%20y.mp3");
    }

    #[test]
    fn test_target_among_other_params() {
        let url = target_from_query(Some("t=1&url=http%3A%2F%2Fa.com%2Fx.mp3")).unwrap();
        assert_eq!(url.as_str(), "http://a.com/x.mp3");
    }

    #[test]
    fn test_target_errors() {
        assert!(matches!(target_from_query(None), Err(ProxyError::MissingUrl)));
        assert!(matches!(
            target_from_query(Some("url=")),
            Err(ProxyError::MissingUrl)
        ));
        assert!(matches!(
            target_from_query(Some("other=1")),
            Err(ProxyError::MissingUrl)
        ));
        assert!(matches!(
            target_from_query(Some("url=%FF%FE")),
            Err(ProxyError::InvalidEncoding)
        ));
        assert!(matches!(
            target_from_query(Some("url=not%20a%20url")),
            Err(ProxyError::InvalidUrl(_))
        ));
        assert!(matches!(
            target_from_query(Some("url=ftp%3A%2F%2Fa.com%2Fx.mp3")),
            Err(ProxyError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_hop_by_hop_filtered() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/ogg"));
        upstream.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

        let headers = forwarded_headers(&upstream);
        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key(header::CONTENT_TYPE));
        assert!(headers.contains_key(header::ACCEPT_RANGES));
    }

    async fn body_bytes(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    fn entry(data: &'static [u8]) -> CacheEntry {
        CacheEntry {
            bytes: Bytes::from_static(data),
            content_type: "audio/ogg".into(),
            created_at: tokio::time::Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_cache_full_response() {
        let response = respond_from_cache(&entry(b"0123456789"), None);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/ogg");
        assert_eq!(&body_bytes(response).await[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_cache_partial_response() {
        let response = respond_from_cache(&entry(b"0123456789"), Some("bytes=2-5"));
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
        assert_eq!(&body_bytes(response).await[..], b"2345");
    }

    fn recorder(
        chunks: Vec<std::io::Result<Bytes>>,
        expected: u64,
        cache: &Arc<AudioCache>,
    ) -> Recorder {
        Recorder {
            stream: stream::iter(chunks).boxed(),
            buffer: BytesMut::new(),
            expected,
            cache: Arc::clone(cache),
            key: "https://cdn.example.com/a.mp3".into(),
            content_type: "audio/mpeg".into(),
        }
    }

    #[tokio::test]
    async fn test_recorder_commits_complete_body() {
        let cache = Arc::new(AudioCache::default());
        let chunks = vec![Ok(Bytes::from_static(b"abc")), Ok(Bytes::from_static(b"def"))];
        let relayed: Vec<_> = recorder(chunks, 6, &cache).into_stream().collect().await;

        assert_eq!(relayed.len(), 2);
        let entry = cache.get("https://cdn.example.com/a.mp3").unwrap();
        assert_eq!(&entry.bytes[..], b"abcdef");
    }

    #[tokio::test]
    async fn test_recorder_skips_failed_transfer() {
        let cache = Arc::new(AudioCache::default());
        let chunks = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(std::io::Error::other("connection reset")),
            Ok(Bytes::from_static(b"def")),
        ];
        let relayed: Vec<_> = recorder(chunks, 6, &cache).into_stream().collect().await;

        // Stream ends at the error; nothing after it is relayed
        assert_eq!(relayed.len(), 2);
        assert!(relayed[1].is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_recorder_skips_short_body() {
        let cache = Arc::new(AudioCache::default());
        let chunks = vec![Ok(Bytes::from_static(b"abc"))];
        let _: Vec<_> = recorder(chunks, 10, &cache).into_stream().collect().await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_malformed_range_serves_full() {
        let response = respond_from_cache(&entry(b"0123456789"), Some("bytes=9-2"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&body_bytes(response).await[..], b"0123456789");
    }
}
