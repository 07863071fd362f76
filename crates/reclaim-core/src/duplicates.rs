//! Three-stage duplicate content finder.
//!
//! 1. Enumerate regular files and bucket them by exact size. Empty files are
//!    never candidates.
//! 2. Within each bucket of two or more, hash the first
//!    [`PARTIAL_HASH_BYTES`] and re-bucket by `(size, digest)`.
//! 3. Within each surviving bucket, hash the whole file in 64KB chunks.
//!    Files sharing a full hash form one [`DuplicateGroup`].
//!
//! A file that disappears or becomes unreadable between stages is dropped.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use blake3::{Hash, Hasher};
use reclaim_schema::{ContentHash, DuplicateGroup, OperationResult};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::filters::{has_package_extension, is_hidden};
use crate::trash::Reclaimer;

/// Prefix length read by the partial digest.
pub const PARTIAL_HASH_BYTES: u64 = 128 * 1024;

const CHUNK_SIZE: usize = 64 * 1024;

/// Groups files with identical content.
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    pub include_hidden: bool,
    pub skip_packages: bool,
    cancel: CancellationToken,
}

impl DuplicateDetector {
    pub fn new(include_hidden: bool, skip_packages: bool) -> Self {
        Self {
            include_hidden,
            skip_packages,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next file boundary once `cancel` fires.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Find duplicate groups under `roots`, largest reclaimable first.
    ///
    /// Cancellation yields an empty list: a partial grouping would claim
    /// files are unique when they simply were not compared.
    pub fn scan(&self, roots: &[PathBuf]) -> Vec<DuplicateGroup> {
        let Some(by_size) = self.bucket_by_size(roots) else {
            tracing::info!("Duplicate scan cancelled during enumeration");
            return Vec::new();
        };
        let candidates: usize = by_size.values().map(Vec::len).sum();
        tracing::debug!(buckets = by_size.len(), files = candidates, "Size buckets built");
        self.group(by_size)
    }

    /// Stages 2 and 3 over the size buckets, sorted for output.
    fn group(&self, by_size: HashMap<u64, Vec<PathBuf>>) -> Vec<DuplicateGroup> {
        let mut groups = Vec::new();
        for (size, files) in by_size {
            for (partial, files) in self.bucket_by_partial(&files) {
                if self.cancel.is_cancelled() {
                    break;
                }
                groups.extend(self.confirm(size, partial, files));
            }
        }
        if self.cancel.is_cancelled() {
            tracing::info!("Duplicate scan cancelled during hashing");
            return Vec::new();
        }

        groups.sort_by(|a, b| {
            b.reclaimable_bytes()
                .cmp(&a.reclaimable_bytes())
                .then_with(|| a.files.first().cmp(&b.files.first()))
        });

        tracing::info!(
            groups = groups.len(),
            reclaimable = groups.iter().map(DuplicateGroup::reclaimable_bytes).sum::<u64>(),
            "Duplicate scan finished"
        );
        groups
    }

    /// Stage 1. `None` when cancelled.
    fn bucket_by_size(&self, roots: &[PathBuf]) -> Option<HashMap<u64, Vec<PathBuf>>> {
        let mut by_size: HashMap<u64, Vec<PathBuf>> = HashMap::new();
        let mut seen = HashSet::new();

        for root in roots {
            let walker = WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| {
                    if e.depth() == 0 {
                        return true;
                    }
                    if !self.include_hidden && is_hidden(e.file_name()) {
                        return false;
                    }
                    !(self.skip_packages && e.file_type().is_dir() && has_package_extension(e.path()))
                });

            for entry in walker {
                if self.cancel.is_cancelled() {
                    return None;
                }
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::trace!(error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(meta) = entry.metadata() else { continue };
                if meta.len() == 0 || !seen.insert(file_identity(entry.path(), &meta)) {
                    continue;
                }
                by_size
                    .entry(meta.len())
                    .or_default()
                    .push(entry.into_path());
            }
        }

        by_size.retain(|_, files| files.len() > 1);
        Some(by_size)
    }

    /// Stage 2.
    fn bucket_by_partial(&self, files: &[PathBuf]) -> Vec<(Hash, Vec<PathBuf>)> {
        let mut buckets = DigestBuckets::default();
        for path in files {
            if self.cancel.is_cancelled() {
                break;
            }
            match partial_digest(path) {
                Ok(digest) => buckets.insert(digest, path.clone()),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Dropped from duplicate scan");
                }
            }
        }
        buckets.shared().collect()
    }

    /// Stage 3.
    fn confirm(&self, size: u64, partial: Hash, files: Vec<PathBuf>) -> Vec<DuplicateGroup> {
        // The prefix read already covered the whole file.
        if size <= PARTIAL_HASH_BYTES {
            return vec![DuplicateGroup {
                id: ContentHash::from(partial),
                files,
                size_per_file: size,
            }];
        }

        let mut buckets = DigestBuckets::default();
        for path in files {
            if self.cancel.is_cancelled() {
                break;
            }
            match full_digest(&path) {
                Ok(digest) => buckets.insert(digest, path),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Dropped from duplicate scan");
                }
            }
        }

        buckets
            .shared()
            .map(|(digest, files)| DuplicateGroup {
                id: ContentHash::from(digest),
                files,
                size_per_file: size,
            })
            .collect()
    }

    /// Move every given path into the holding area, counting failures.
    pub fn trash(reclaimer: &Reclaimer, paths: &[PathBuf]) -> OperationResult {
        let result = reclaimer.reclaim_paths(paths);
        tracing::info!(
            removed = result.items_removed,
            failed = result.items_failed,
            "Trashed duplicates"
        );
        result
    }
}

/// Paths keyed by digest, in first-seen order.
#[derive(Default)]
struct DigestBuckets {
    index: HashMap<Hash, usize>,
    buckets: Vec<(Hash, Vec<PathBuf>)>,
}

impl DigestBuckets {
    fn insert(&mut self, digest: Hash, path: PathBuf) {
        match self.index.entry(digest) {
            Entry::Occupied(slot) => self.buckets[*slot.get()].1.push(path),
            Entry::Vacant(slot) => {
                slot.insert(self.buckets.len());
                self.buckets.push((digest, vec![path]));
            }
        }
    }

    /// Buckets holding two or more paths.
    fn shared(self) -> impl Iterator<Item = (Hash, Vec<PathBuf>)> {
        self.buckets.into_iter().filter(|(_, files)| files.len() > 1)
    }
}

/// Digest of at most the first [`PARTIAL_HASH_BYTES`] bytes.
pub fn partial_digest(path: &Path) -> io::Result<Hash> {
    hash_reader(File::open(path)?.take(PARTIAL_HASH_BYTES))
}

/// Digest of the whole file, streamed.
pub fn full_digest(path: &Path) -> io::Result<Hash> {
    hash_reader(File::open(path)?)
}

fn hash_reader(mut reader: impl Read) -> io::Result<Hash> {
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize())
}

/// Hard links and overlapping roots resolve to the same identity.
#[cfg(unix)]
fn file_identity(_path: &Path, meta: &std::fs::Metadata) -> (u64, u64, Option<PathBuf>) {
    use std::os::unix::fs::MetadataExt;
    (meta.dev(), meta.ino(), None)
}

#[cfg(not(unix))]
fn file_identity(path: &Path, _meta: &std::fs::Metadata) -> (u64, u64, Option<PathBuf>) {
    (0, 0, Some(path.to_path_buf()))
}
