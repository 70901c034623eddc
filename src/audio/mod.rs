//! Audio relay for in-browser playback.
//!
//! Browsers scrub through audio with `Range` requests, and many podcast
//! hosts refuse cross-origin playback. The proxy relays those requests and
//! keeps short files in memory so repeated plays and seeks are served
//! locally.
//!
//! - [`range`] - `Range: bytes=` parsing
//! - [`cache`] - TTL-bounded cache of complete audio bodies
//! - [`proxy`] - the per-request cache-or-relay flow

pub mod cache;
pub mod proxy;
pub mod range;

pub use cache::{AudioCache, CacheEntry};
pub use proxy::{target_from_query, AudioProxy, ProxyError, DEFAULT_CONTENT_TYPE};
pub use range::{parse_range, ByteRange};
