//! On-disk footprint estimation.
//!
//! Best effort: anything missing or unreadable counts as zero so an estimate
//! can never abort the operation that asked for it.

use std::fs::{self, Metadata};
use std::path::Path;

use walkdir::WalkDir;

use crate::filters::is_hidden;

/// Allocated size of a file, or of every regular file beneath a directory.
///
/// Directories themselves contribute nothing. Symlinks are not followed.
pub fn estimate(path: &Path, include_hidden: bool) -> u64 {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return 0;
    };
    if meta.is_file() {
        return allocated_size(&meta);
    }
    if !meta.is_dir() {
        return 0;
    }

    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || include_hidden || !is_hidden(e.file_name()))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| allocated_size(&m))
        .fold(0u64, u64::saturating_add)
}

/// Blocks actually allocated, falling back to the logical length.
#[cfg(unix)]
pub fn allocated_size(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;

    match meta.blocks() {
        0 => meta.len(),
        blocks => blocks.saturating_mul(512),
    }
}

/// Blocks actually allocated, falling back to the logical length.
#[cfg(not(unix))]
pub fn allocated_size(meta: &Metadata) -> u64 {
    meta.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // Incompressible filler so transparent fs compression cannot shrink allocation.
    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x2545_f491_4f6c_dd1d_u64;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                state as u8
            })
            .collect()
    }

    #[test]
    fn missing_path_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(estimate(&dir.path().join("nope"), true), 0);
    }

    #[test]
    fn file_is_at_least_logical_size() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("f");
        fs::write(&f, noise(10_000)).unwrap();
        assert!(estimate(&f, false) >= 10_000);
    }

    #[test]
    fn directory_sums_descendants_and_respects_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("a"), noise(5000)).unwrap();
        fs::write(root.join("sub/b"), noise(5000)).unwrap();
        fs::write(root.join(".hidden/c"), noise(50_000)).unwrap();
        fs::write(root.join(".dot"), noise(50_000)).unwrap();

        let visible = estimate(&root, false);
        let all = estimate(&root, true);

        assert!(visible >= 10_000);
        assert!(all >= visible + 100_000);
        assert_eq!(
            visible,
            estimate(&root.join("a"), false) + estimate(&root.join("sub/b"), false)
        );
    }
}
