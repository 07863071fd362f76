//! Content digests and duplicate groups.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hex-encoded BLAKE3 digest of a file's full content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap a raw hex string (64 hex chars).
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Compute the digest of an in-memory buffer.
    pub fn compute(data: &[u8]) -> Self {
        Self::from(blake3::hash(data))
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<blake3::Hash> for ContentHash {
    fn from(hash: blake3::Hash) -> Self {
        Self(hash.to_hex().to_string())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Files confirmed to share identical content.
///
/// All `files` have the same size and digest. Keeping one copy is the
/// baseline, so everything beyond the first is reclaimable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Full-content digest shared by every file; doubles as the group's identity.
    pub id: ContentHash,
    /// Member paths in scan order.
    pub files: Vec<PathBuf>,
    /// Logical size of each member, in bytes.
    pub size_per_file: u64,
}

impl DuplicateGroup {
    /// Bytes freed by keeping one copy and removing the rest.
    pub fn reclaimable_bytes(&self) -> u64 {
        (self.files.len().saturating_sub(1) as u64).saturating_mul(self.size_per_file)
    }

    /// Default removal candidates: every file but the first.
    pub fn redundant(&self) -> &[PathBuf] {
        self.files.get(1..).unwrap_or_default()
    }
}
