//! Feed ingestion: fetching, parsing, classification and aggregation.
//!
//! - [`parser`] - RSS/Atom parsing with `feed-rs`
//! - [`fetcher`] - bounded HTTP retrieval of a single feed
//! - [`classify`] - media type, bias label and thumbnail for an entry
//! - [`aggregate`] - the multi-feed pipeline producing [`Article`]s
//! - [`filter`] - tag/search/source filtering and pagination
//! - [`registry`] - the persisted list of subscribed feed URLs
//!
//! # Example
//!
//! ```ignore
//! use jaggregator::feed::{AggregateLimits, Aggregator};
//!
//! let aggregator = Aggregator::new(client, Duration::from_secs(10));
//! let articles = aggregator.aggregate(&feeds, AggregateLimits::default()).await?;
//! ```

pub mod aggregate;
pub mod classify;
pub mod fetcher;
pub mod filter;
pub mod parser;
pub mod registry;

pub use aggregate::{
    feed_urls_from_json, AggregateError, AggregateLimits, Aggregator, Article, ArticleKind,
    AudioSource, FeedOutcome,
};
pub use classify::{classify, ClassifyInput, Classification, MediaTag, NO_LOGO_THUMBNAIL};
pub use fetcher::{fetch_feed, FetchError};
pub use filter::{without_feed, ArticleQuery};
pub use registry::{FeedRegistry, RegistryError};
