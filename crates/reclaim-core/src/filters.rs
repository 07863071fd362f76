//! Entry classification shared by the walkers.

use std::ffi::OsStr;
use std::path::Path;

/// Directory extensions that present as a single opaque item.
pub const PACKAGE_EXTENSIONS: &[&str] = &[
    "app",
    "bundle",
    "framework",
    "plugin",
    "kext",
    "pkg",
    "mpkg",
    "photoslibrary",
    "musiclibrary",
    "xcarchive",
    "lrlibrary",
    "fcpbundle",
    "imovielibrary",
];

/// Dot-prefixed names are hidden.
pub fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

/// True when `path` has a package extension. Callers check that it is a directory.
pub fn has_package_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| {
            PACKAGE_EXTENSIONS
                .iter()
                .any(|p| p.eq_ignore_ascii_case(ext))
        })
}

/// A directory that should be treated as one unit.
pub fn is_package_dir(path: &Path, is_dir: bool) -> bool {
    is_dir && has_package_extension(path)
}
