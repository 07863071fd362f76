//! Holding area and the per-item reclaim step.
//!
//! Nothing in the engine deletes data. Items are moved into a holding area
//! that can hand them back, and every move is recorded as a
//! [`TrashedItem`] so the undo ledger knows where to find it.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use reclaim_schema::{OperationResult, TrashedItem};
use thiserror::Error;

use crate::error::{EngineError, Result};
use crate::size;

/// Extension of the metadata files kept next to trashed items.
pub const TRASHINFO_EXTENSION: &str = "trashinfo";

/// A recoverable location items can be moved into and back out of.
pub trait HoldingArea: Send + Sync + fmt::Debug {
    /// Move `path` into the holding area, returning its new location.
    fn stash(&self, path: &Path) -> io::Result<PathBuf>;

    /// Move a held item back to `original`.
    fn unstash(&self, held: &Path, original: &Path) -> io::Result<()>;
}

impl<T: HoldingArea + ?Sized> HoldingArea for Arc<T> {
    fn stash(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).stash(path)
    }
    fn unstash(&self, held: &Path, original: &Path) -> io::Result<()> {
        (**self).unstash(held, original)
    }
}

/// Freedesktop-style trash directory.
///
/// ```text
/// <root>/
/// ├── files/            # the items themselves
/// └── info/<name>.trashinfo
/// ```
#[derive(Debug, Clone)]
pub struct TrashDir {
    root: PathBuf,
}

impl TrashDir {
    /// Open (creating if needed) a trash directory at `root`.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("files"))?;
        fs::create_dir_all(root.join("info"))?;
        Ok(Self { root })
    }

    /// Open the platform trash.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoHome`] if no trash location can be derived, or
    /// an IO error if it cannot be created.
    pub fn open_default() -> Result<Self> {
        let root = crate::default_trash_root().ok_or(EngineError::NoHome)?;
        Ok(Self::open(root)?)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    pub fn info_dir(&self) -> PathBuf {
        self.root.join("info")
    }

    fn info_path(&self, name: &str) -> PathBuf {
        self.info_dir().join(format!("{name}.{TRASHINFO_EXTENSION}"))
    }

    /// Reserve a free name by creating its info file exclusively.
    fn reserve(&self, original: &Path) -> io::Result<String> {
        let base = original
            .file_name()
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "path has no file name"))?
            .to_string_lossy()
            .into_owned();

        let body = format!(
            "[Trash Info]\nPath={}\nDeletionDate={}\n",
            encode_info_path(original),
            Local::now().format("%Y-%m-%dT%H:%M:%S")
        );

        for n in 1u32.. {
            let name = if n == 1 {
                base.clone()
            } else {
                format!("{base}.{n}")
            };
            if self.files_dir().join(&name).symlink_metadata().is_ok() {
                continue;
            }
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.info_path(&name))
            {
                Ok(mut info) => {
                    info.write_all(body.as_bytes())?;
                    return Ok(name);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::other("trash name space exhausted"))
    }
}

impl HoldingArea for TrashDir {
    fn stash(&self, path: &Path) -> io::Result<PathBuf> {
        let original = std::path::absolute(path)?;
        // Fail early (NotFound) if the item vanished.
        fs::symlink_metadata(&original)?;

        let name = self.reserve(&original)?;
        let dest = self.files_dir().join(&name);
        if let Err(e) = move_path(&original, &dest) {
            let _ = fs::remove_file(self.info_path(&name));
            return Err(e);
        }
        Ok(dest)
    }

    fn unstash(&self, held: &Path, original: &Path) -> io::Result<()> {
        move_path(held, original)?;
        if let Some(name) = held.file_name() {
            let _ = fs::remove_file(self.info_path(&name.to_string_lossy()));
        }
        Ok(())
    }
}

/// `Path=` value for a trashinfo file: percent-encoded, `/` left as is.
fn encode_info_path(path: &Path) -> String {
    let mut encoded = String::new();
    for &byte in path_bytes(path).as_ref() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(char::from(byte));
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> std::borrow::Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    std::borrow::Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> std::borrow::Cow<'_, [u8]> {
    match path.to_string_lossy() {
        std::borrow::Cow::Borrowed(s) => std::borrow::Cow::Borrowed(s.as_bytes()),
        std::borrow::Cow::Owned(s) => std::borrow::Cow::Owned(s.into_bytes()),
    }
}

/// Rename, falling back to copy-and-remove across filesystems.
pub fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            tracing::debug!(from = %from.display(), to = %to.display(), "Cross-device move, copying");
            let meta = fs::symlink_metadata(from)?;
            if meta.is_dir() {
                let options = fs_extra::dir::CopyOptions {
                    copy_inside: true,
                    ..fs_extra::dir::CopyOptions::new()
                };
                fs_extra::dir::move_dir(from, to, &options).map_err(io::Error::other)?;
            } else {
                fs_extra::file::move_file(from, to, &fs_extra::file::CopyOptions::new())
                    .map_err(io::Error::other)?;
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// A single item that could not be moved into the holding area.
#[derive(Error, Debug)]
#[error("Failed to reclaim {}: {source}", path.display())]
pub struct ReclaimFailure {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Moves items into a shared holding area.
#[derive(Debug, Clone)]
pub struct Reclaimer {
    holding: Arc<dyn HoldingArea>,
}

impl Reclaimer {
    pub fn new(holding: Arc<dyn HoldingArea>) -> Self {
        Self { holding }
    }

    pub fn holding(&self) -> &Arc<dyn HoldingArea> {
        &self.holding
    }

    /// Move one item. Never retried.
    ///
    /// The recorded original is absolute, so a restore lands in the same
    /// place whatever the working directory is by then.
    ///
    /// # Errors
    ///
    /// Returns a [`ReclaimFailure`] if the item vanished, is not permitted to
    /// move, or the holding area is unavailable.
    pub fn reclaim(&self, path: &Path) -> Result<TrashedItem, ReclaimFailure> {
        let failure = |source: io::Error| ReclaimFailure {
            path: path.to_path_buf(),
            source,
        };
        let original = std::path::absolute(path).map_err(failure)?;
        let held = self.holding.stash(&original).map_err(failure)?;
        tracing::trace!(path = %original.display(), held = %held.display(), "Reclaimed");
        Ok(TrashedItem::new(original, held))
    }

    /// Reclaim one item of known size into an accumulator, counting failure instead of raising it.
    pub fn reclaim_into(&self, path: &Path, bytes: u64, result: &mut OperationResult) {
        match self.reclaim(path) {
            Ok(item) => result.record_removed(item, bytes),
            Err(e) => {
                tracing::warn!(path = %e.path.display(), error = %e.source, "Could not reclaim item");
                result.record_failed();
            }
        }
    }

    /// Reclaim an explicit list of paths (duplicates, preview selections).
    ///
    /// Sizes are estimated with hidden content included, since the caller
    /// named these paths directly.
    pub fn reclaim_paths(&self, paths: &[PathBuf]) -> OperationResult {
        let mut result = OperationResult::new();
        for path in paths {
            let bytes = size::estimate(path, true);
            self.reclaim_into(path, bytes, &mut result);
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Holding area that refuses selected file names.
    #[derive(Debug)]
    pub(crate) struct Flaky {
        pub(crate) inner: TrashDir,
        pub(crate) refuse: Mutex<HashSet<String>>,
        /// Held names that cannot be moved back out.
        pub(crate) stuck: Mutex<HashSet<String>>,
    }

    impl Flaky {
        pub(crate) fn new(root: &Path, refuse: &[&str]) -> Self {
            Self {
                inner: TrashDir::open(root).unwrap(),
                refuse: Mutex::new(refuse.iter().map(|s| (*s).to_string()).collect()),
                stuck: Mutex::new(HashSet::new()),
            }
        }
    }

    fn name_of(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    impl HoldingArea for Flaky {
        fn stash(&self, path: &Path) -> io::Result<PathBuf> {
            if self.refuse.lock().unwrap().contains(&name_of(path)) {
                return Err(io::Error::new(ErrorKind::PermissionDenied, "refused"));
            }
            self.inner.stash(path)
        }
        fn unstash(&self, held: &Path, original: &Path) -> io::Result<()> {
            if self.stuck.lock().unwrap().contains(&name_of(held)) {
                return Err(io::Error::new(ErrorKind::PermissionDenied, "stuck"));
            }
            self.inner.unstash(held, original)
        }
    }

    #[test]
    fn stash_moves_and_records_info() {
        let dir = tempfile::tempdir().unwrap();
        let trash = TrashDir::open(dir.path().join("trash")).unwrap();
        let item = dir.path().join("junk.txt");
        fs::write(&item, b"junk").unwrap();

        let held = trash.stash(&item).unwrap();

        assert!(!item.exists());
        assert_eq!(fs::read(&held).unwrap(), b"junk");
        let info = fs::read_to_string(trash.info_dir().join("junk.txt.trashinfo")).unwrap();
        assert!(info.contains("Path="));
        assert!(info.contains("junk.txt"));
    }

    #[test]
    fn info_path_is_percent_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let trash = TrashDir::open(dir.path().join("trash")).unwrap();
        let support = dir.path().join("Application Support");
        fs::create_dir(&support).unwrap();
        let item = support.join("50%.txt");
        fs::write(&item, b"x").unwrap();

        trash.stash(&item).unwrap();

        let info = fs::read_to_string(trash.info_dir().join("50%.txt.trashinfo")).unwrap();
        let line = info.lines().find(|l| l.starts_with("Path=")).unwrap();
        assert!(line.ends_with("/Application%20Support/50%25.txt"), "{line}");
        assert!(!line.contains(' '));
    }

    #[test]
    fn encoding_keeps_separators_and_unreserved() {
        assert_eq!(encode_info_path(Path::new("/a/b-c_d.e~f")), "/a/b-c_d.e~f");
        assert_eq!(encode_info_path(Path::new("/x y/#1")), "/x%20y/%231");
    }

    #[test]
    fn name_collisions_get_unique_slots() {
        let dir = tempfile::tempdir().unwrap();
        let trash = TrashDir::open(dir.path().join("trash")).unwrap();
        let a = dir.path().join("a/cache");
        let b = dir.path().join("b/cache");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();

        let held_a = trash.stash(&a).unwrap();
        let held_b = trash.stash(&b).unwrap();

        assert_ne!(held_a, held_b);
        assert!(held_a.is_dir() && held_b.is_dir());
    }

    #[test]
    fn unstash_round_trips_and_clears_info() {
        let dir = tempfile::tempdir().unwrap();
        let trash = TrashDir::open(dir.path().join("trash")).unwrap();
        let item = dir.path().join("keep.log");
        fs::write(&item, b"log").unwrap();

        let held = trash.stash(&item).unwrap();
        trash.unstash(&held, &item).unwrap();

        assert_eq!(fs::read(&item).unwrap(), b"log");
        assert!(!trash.info_dir().join("keep.log.trashinfo").exists());
    }

    #[test]
    fn vanished_item_is_a_failure_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let reclaimer = Reclaimer::new(Arc::new(TrashDir::open(dir.path().join("t")).unwrap()));

        let err = reclaimer.reclaim(&dir.path().join("ghost")).unwrap_err();
        assert_eq!(err.source.kind(), ErrorKind::NotFound);
        assert!(fs::read_dir(dir.path().join("t/info")).unwrap().next().is_none());
    }

    #[test]
    fn reclaim_paths_counts_each_item_independently() {
        let dir = tempfile::tempdir().unwrap();
        let flaky = Flaky::new(&dir.path().join("t"), &["bad"]);
        let reclaimer = Reclaimer::new(Arc::new(flaky));
        let good = dir.path().join("good");
        let bad = dir.path().join("bad");
        fs::write(&good, b"1").unwrap();
        fs::write(&bad, b"2").unwrap();

        let result = reclaimer.reclaim_paths(&[bad.clone(), good.clone(), dir.path().join("gone")]);

        assert_eq!(result.items_removed, 1);
        assert_eq!(result.items_failed, 2);
        assert_eq!(result.trashed[0].original_path, good);
        assert!(bad.exists());
    }
}
