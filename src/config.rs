//! Configuration file parser for `jaggregator.toml`.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde, though we log a warning since they
//! are usually typos.
use crate::feed::AggregateLimits;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Server configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen_addr: String,

    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,

    /// JSON file holding the subscribed feed URLs.
    pub feeds_file: PathBuf,

    /// Entries taken from each feed per aggregation.
    pub per_feed_limit: usize,

    /// Feeds taken from each aggregation request.
    pub total_feed_limit: usize,

    /// Timeout for one feed or article page fetch, in seconds.
    pub fetch_timeout_secs: u64,

    /// Lifetime of a cached audio body, in seconds.
    pub audio_cache_ttl_secs: u64,

    /// Largest audio body kept in the cache, in bytes.
    pub audio_cache_max_bytes: u64,

    /// Number of expanded article pages kept in memory. 0 disables the cache.
    pub content_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4000".to_string(),
            allowed_origins: vec!["https://jaggregator.vercel.app".to_string()],
            feeds_file: PathBuf::from("feeds.json"),
            per_feed_limit: 10,
            total_feed_limit: 10,
            fetch_timeout_secs: 10,
            audio_cache_ttl_secs: 3600,
            audio_cache_max_bytes: 10 * 1024 * 1024,
            content_cache_capacity: 256,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "listen_addr",
        "allowed_origins",
        "feeds_file",
        "per_feed_limit",
        "total_feed_limit",
        "fetch_timeout_secs",
        "audio_cache_ttl_secs",
        "audio_cache_max_bytes",
        "content_cache_capacity",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check size before reading so a huge file is never loaded
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            path = %path.display(),
            listen = %config.listen_addr,
            feeds_file = %config.feeds_file.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn audio_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.audio_cache_ttl_secs)
    }

    pub fn aggregate_limits(&self) -> AggregateLimits {
        AggregateLimits {
            per_feed: self.per_feed_limit,
            total_feeds: self.total_feed_limit,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jaggregator.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_addr, "0.0.0.0:4000");
        assert_eq!(
            config.allowed_origins,
            vec!["https://jaggregator.vercel.app".to_string()]
        );
        assert_eq!(config.feeds_file, PathBuf::from("feeds.json"));
        assert_eq!(config.aggregate_limits(), AggregateLimits::default());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.audio_cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.audio_cache_max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.content_cache_capacity, 256);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_and_whitespace_files_return_default() {
        for content in ["", "   \n  \n  "] {
            let (_dir, path) = write_config(content);
            assert_eq!(Config::load(&path).unwrap(), Config::default());
        }
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (_dir, path) = write_config("per_feed_limit = 25\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.per_feed_limit, 25);
        assert_eq!(config.total_feed_limit, 10);
        assert_eq!(config.listen_addr, "0.0.0.0:4000");
    }

    #[test]
    fn test_full_config() {
        let (_dir, path) = write_config(
            r#"
listen_addr = "127.0.0.1:8080"
allowed_origins = []
feeds_file = "/var/lib/jaggregator/feeds.json"
per_feed_limit = 5
total_feed_limit = 20
fetch_timeout_secs = 3
audio_cache_ttl_secs = 60
audio_cache_max_bytes = 1024
content_cache_capacity = 0
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config,
            Config {
                listen_addr: "127.0.0.1:8080".to_string(),
                allowed_origins: vec![],
                feeds_file: PathBuf::from("/var/lib/jaggregator/feeds.json"),
                per_feed_limit: 5,
                total_feed_limit: 20,
                fetch_timeout_secs: 3,
                audio_cache_ttl_secs: 60,
                audio_cache_max_bytes: 1024,
                content_cache_capacity: 0,
            }
        );
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let (_dir, path) = write_config("fetch_timeout_secs = 0\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (_dir, path) = write_config("this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (_dir, path) = write_config("per_feed_limit = 3\ntotally_fake_key = \"x\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.per_feed_limit, 3);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (_dir, path) = write_config("per_feed_limit = \"ten\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (_dir, path) = write_config(&"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
    }
}
