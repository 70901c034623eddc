/// An inclusive byte range resolved against a known body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive.
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered; never zero.
    pub fn byte_count(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value, e.g. `bytes 0-99/1000`.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Parses a `Range` header against a body of `total` bytes.
///
/// Only a single `bytes=start-end` or `bytes=start-` range is understood.
/// An omitted or too-large `end` is clamped to the last byte. Anything else
/// (suffix ranges, multiple ranges, `start > end`, `start` past the end,
/// garbage) yields `None`, and the caller serves the full body.
///
/// # Examples
///
/// ```
/// use jaggregator::audio::{parse_range, ByteRange};
///
/// assert_eq!(parse_range("bytes=0-99", 1000), Some(ByteRange { start: 0, end: 99 }));
/// assert_eq!(parse_range("bytes=900-", 1000), Some(ByteRange { start: 900, end: 999 }));
/// assert_eq!(parse_range("bytes=-100", 1000), None);
/// assert_eq!(parse_range("items=0-1", 1000), None);
/// ```
pub fn parse_range(header: &str, total: u64) -> Option<ByteRange> {
    let spec = header.trim().strip_prefix("bytes=")?.trim();
    if spec.contains(',') || total == 0 {
        return None;
    }

    let (start, end) = spec.split_once('-')?;
    let start: u64 = parse_digits(start)?;
    let end = match end.trim() {
        "" => total - 1,
        raw => parse_digits(raw)?.min(total - 1),
    };

    if start > end || start >= total {
        return None;
    }

    Some(ByteRange { start, end })
}

fn parse_digits(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}
