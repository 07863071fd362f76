//! Records streamed by the oversized-file scanner.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An oversized item found by the incremental scanner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BigFileRecord {
    /// Location of the file or package.
    pub path: PathBuf,
    /// Size in bytes (recursive total for packages).
    pub size: u64,
    /// True when the record stands for a whole package directory.
    pub is_package: bool,
}
