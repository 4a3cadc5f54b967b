//! Building imgproxy processing paths from client requests.

use std::fmt;

use crate::config::{THUMBNAIL_FORMAT, THUMBNAIL_QUALITY};

/// Unsigned imgproxy processing path for one thumbnail.
///
/// Renders as `/rs:fit:{width}/q:{quality}/plain/{source_url}@{format}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingPath {
    pub width: u32,
    pub quality: u8,
    pub format: &'static str,
    /// Plain (not base64) source URL imgproxy downloads the original from
    pub source_url: String,
}

impl ProcessingPath {
    /// Thumbnail of `path` inside the object store, using the fixed quality and format.
    pub fn thumbnail(object_store_prefix: &str, path: &str, width: u32) -> Self {
        Self {
            width,
            quality: THUMBNAIL_QUALITY,
            format: THUMBNAIL_FORMAT,
            source_url: format!("{}{}", object_store_prefix, path),
        }
    }
}

impl fmt::Display for ProcessingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/rs:fit:{}/q:{}/plain/{}@{}",
            self.width, self.quality, self.source_url, self.format
        )
    }
}

/// Parse the `width` query value.
///
/// Reads an optional sign and the leading decimal digits after any leading
/// whitespace, ignoring trailing characters (`"640px"` is 640). Returns `None`
/// when there are no digits or the value does not fit a pixel width, which
/// never matches an allowed width.
pub fn parse_width(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = unsigned
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits_len == 0 {
        return None;
    }

    let value: u32 = unsigned[..digits_len].parse().ok()?;
    if negative && value != 0 {
        return None;
    }
    Some(value)
}
