use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default time an entry stays servable.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
/// Default ceiling for a cacheable response body.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024; // 10MB

/// A fully downloaded audio body. Immutable once committed.
#[derive(Debug)]
pub struct CacheEntry {
    pub bytes: Bytes,
    pub content_type: String,
    pub created_at: Instant,
}

impl CacheEntry {
    pub fn total_len(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Process-wide audio body cache keyed by decoded upstream URL.
///
/// Entries are whole bodies only. Readers get an `Arc` to the entry, so a
/// concurrent eviction never invalidates a response already being served.
/// Two misses on the same URL may both commit; the last write wins.
#[derive(Debug)]
pub struct AudioCache {
    entries: DashMap<String, Arc<CacheEntry>>,
    ttl: Duration,
    max_entry_bytes: u64,
}

impl Default for AudioCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_BYTES)
    }
}

impl AudioCache {
    pub fn new(ttl: Duration, max_entry_bytes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entry_bytes,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether a body of `len` bytes is small enough to cache.
    pub fn admits(&self, len: u64) -> bool {
        len > 0 && len <= self.max_entry_bytes
    }

    /// Returns the live entry for `url`, evicting it first if it has expired.
    pub fn get(&self, url: &str) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.get(url).map(|e| Arc::clone(e.value()))?;

        if entry.created_at.elapsed() < self.ttl {
            return Some(entry);
        }

        // Only remove the entry we saw; a fresh commit may have replaced it
        self.entries
            .remove_if(url, |_, current| Arc::ptr_eq(current, &entry));
        tracing::debug!(url = %url, "Audio cache entry expired");
        None
    }

    /// Commits a complete body with a fresh timestamp.
    pub fn put(&self, url: impl Into<String>, bytes: Bytes, content_type: impl Into<String>) {
        let entry = CacheEntry {
            bytes,
            content_type: content_type.into(),
            created_at: Instant::now(),
        };
        self.entries.insert(url.into(), Arc::new(entry));
    }

    pub fn remove(&self, url: &str) -> bool {
        self.entries.remove(url).is_some()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes held across all entries.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.value().total_len()).sum()
    }
}
