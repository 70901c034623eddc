use crate::util::{validate_url, UrlValidationError};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// URL failed validation (scheme, host, private address)
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// URL is already subscribed
    #[error("Feed already exists: {0}")]
    Duplicate(String),
    /// Reading or writing the registry file failed
    #[error("Feed registry I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Registry could not be serialized
    #[error("Feed registry JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The ordered list of subscribed feed URLs, persisted as a JSON array.
///
/// Every mutation is written through to disk before it returns, so the file
/// always reflects the last successful `add` or `remove`.
#[derive(Debug)]
pub struct FeedRegistry {
    path: PathBuf,
    feeds: Vec<String>,
}

impl FeedRegistry {
    /// Loads the registry from `path`.
    ///
    /// A missing file yields an empty registry. A file that is not a JSON
    /// array of strings is logged and also treated as empty; it is
    /// overwritten on the next mutation.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();

        let feeds = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(feeds) => feeds,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Feed registry is corrupt, starting empty"
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(RegistryError::Io(e)),
        };

        tracing::debug!(path = %path.display(), feeds = feeds.len(), "Feed registry loaded");
        Ok(Self { path, feeds })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Subscribed URLs in insertion order.
    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    pub fn contains(&self, url: &str) -> bool {
        self.feeds.iter().any(|f| f == url.trim())
    }

    /// Appends a feed URL and persists the registry.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidUrl`] - not http(s), no host, or a private/loopback host
    /// - [`RegistryError::Duplicate`] - already subscribed
    /// - [`RegistryError::Io`] / [`RegistryError::Json`] - the write failed; the
    ///   in-memory list is left unchanged
    pub async fn add(&mut self, url: &str) -> Result<(), RegistryError> {
        let url = url.trim();
        validate_url(url)?;

        if self.contains(url) {
            return Err(RegistryError::Duplicate(url.to_string()));
        }

        let mut next = self.feeds.clone();
        next.push(url.to_string());
        self.commit(next).await?;

        tracing::info!(feed = %url, "Feed added");
        Ok(())
    }

    /// Removes a feed URL and persists the registry.
    ///
    /// Returns whether the URL was subscribed. Removing an absent URL is not
    /// an error and leaves the file untouched.
    pub async fn remove(&mut self, url: &str) -> Result<bool, RegistryError> {
        let url = url.trim();
        validate_url(url)?;

        if !self.contains(url) {
            return Ok(false);
        }

        let next: Vec<String> = self.feeds.iter().filter(|f| *f != url).cloned().collect();
        self.commit(next).await?;

        tracing::info!(feed = %url, "Feed removed");
        Ok(true)
    }

    /// Writes `next` on the blocking pool, then swaps it in.
    async fn commit(&mut self, next: Vec<String>) -> Result<(), RegistryError> {
        let json = serde_json::to_vec_pretty(&next)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&path, &json))
            .await
            .map_err(std::io::Error::other)??;
        self.feeds = next;
        Ok(())
    }
}

/// Writes `content` to a uniquely named sibling temp file, syncs it, then
/// renames it over `dst`. Readers see either the old file or the new one.
fn atomic_write(dst: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    let written = temp_file
        .write_all(content)
        .and_then(|_| temp_file.sync_all());
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }
    drop(temp_file);

    std::fs::rename(&temp_path, dst).inspect_err(|_| {
        let _ = std::fs::remove_file(&temp_path);
    })
}
