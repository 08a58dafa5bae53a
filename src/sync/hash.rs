//! Content digests for sync decisions.
//!
//! Providers report MD5 digests in different encodings: S3 ETags are quoted
//! hex strings, GCS reports base64. Everything is normalized to lowercase hex
//! before comparison.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::{Digest, Md5};

/// Normalize a provider-native digest to lowercase hex.
///
/// Returns `None` for empty values. Values that are neither hex nor a base64
/// MD5 (multipart ETags, for example) are kept as lowercase opaque strings and
/// will simply never match a plain MD5.
pub fn normalize_digest(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    let trimmed = trimmed.trim_matches('"');

    if trimmed.is_empty() {
        return None;
    }

    if trimmed.len() == 32 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Some(trimmed.to_ascii_lowercase());
    }

    if let Ok(bytes) = STANDARD.decode(trimmed) {
        if bytes.len() == 16 {
            return Some(hex::encode(bytes));
        }
    }

    Some(trimmed.to_ascii_lowercase())
}

/// Case-insensitive digest equality. Absent digests never match.
pub fn digests_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Incremental MD5 over streamed chunks.
#[derive(Default)]
pub struct Md5Stream {
    hasher: Md5,
}

impl Md5Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finish and return the lowercase hex digest
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// MD5 of a byte slice as lowercase hex.
pub fn md5_hex(data: &[u8]) -> String {
    let mut stream = Md5Stream::new();
    stream.update(data);
    stream.finish()
}
