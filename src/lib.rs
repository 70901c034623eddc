//! News and podcast aggregator.
//!
//! Aggregates RSS/Atom feeds into one newest-first list of articles tagged
//! with media type and editorial leaning, expands articles into readable
//! content, and relays audio with `Range` support and a small-file cache.
//!
//! - [`feed`] - fetching, parsing, classification, aggregation, subscriptions
//! - [`content`] - full-article extraction
//! - [`audio`] - range-aware audio proxy and cache
//! - [`web`] - the HTTP API
//! - [`config`] - TOML configuration

pub mod audio;
pub mod config;
pub mod content;
pub mod feed;
pub mod util;
pub mod web;
