//! Utility functions shared by the feed pipeline, content expander and audio proxy.
//!
//! - **URL validation**: parsing with scheme checks, plus the stricter
//!   SSRF-aware validation applied to subscribed feed URLs
//! - **Text processing**: control-character stripping, HTML-to-snippet
//!   conversion and character-bounded truncation
//!
//! # Examples
//!
//! ```
//! use jaggregator::util::{parse_http_url, validate_url, truncate_chars};
//!
//! assert!(parse_http_url("http://127.0.0.1:8080/episode.mp3").is_ok());
//! assert!(validate_url("http://127.0.0.1/feed").is_err());
//! assert_eq!(truncate_chars("Hello World", 5), "Hello...");
//! ```

mod text;
mod url_validator;

pub use text::{collapse_whitespace, html_to_snippet, strip_control_chars, truncate_chars};
pub use url_validator::{parse_http_url, validate_url, UrlValidationError};

/// Maximum length, in characters, of an article summary snippet.
pub const MAX_SUMMARY_CHARS: usize = 500;
