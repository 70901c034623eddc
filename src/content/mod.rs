//! Full-article expansion for the in-place reader view.
//!
//! - [`readability`](self::readability) - main-content extraction via the `readability` crate
//! - [`expander`] - page retrieval with an LRU cache keyed by article link

pub mod expander;
pub mod readability;

pub use self::expander::{ContentError, ContentExpander, ExpandedArticle};
pub use self::readability::{extract_readable_content, ReadableContent};

/// HTML shown in place of an article whose content could not be extracted.
pub const PLACEHOLDER_HTML: &str = "<p>No content available</p>";
