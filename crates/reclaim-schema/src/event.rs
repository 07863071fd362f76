//! Fire-and-forget events for the metrics store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of operation produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// User-level and sandboxed caches.
    Caches,
    /// Application and system logs.
    Logs,
    /// Browser caches.
    BrowserData,
    /// Application bundle plus remnants.
    Uninstall,
    /// Redundant copies from a duplicate scan.
    Duplicates,
    /// Items picked from an oversized-file scan.
    LargeFiles,
    /// Arbitrary selection from a staged preview.
    Selection,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Caches => "caches",
            Self::Logs => "logs",
            Self::BrowserData => "browser_data",
            Self::Uninstall => "uninstall",
            Self::Duplicates => "duplicates",
            Self::LargeFiles => "large_files",
            Self::Selection => "selection",
        };
        f.write_str(name)
    }
}

/// Bytes freed by one operation, for the reporting store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupEvent {
    /// Bytes freed by the operation.
    pub bytes_freed: u64,
    /// Operation that freed them.
    pub kind: OperationKind,
    /// When the operation finished.
    pub timestamp: DateTime<Utc>,
    /// Optional free-form origin, e.g. the uninstalled application's name.
    pub source: Option<String>,
}

impl CleanupEvent {
    /// Stamp an event with the current time.
    pub fn now(kind: OperationKind, bytes_freed: u64, source: Option<String>) -> Self {
        Self {
            bytes_freed,
            kind,
            timestamp: Utc::now(),
            source,
        }
    }
}
