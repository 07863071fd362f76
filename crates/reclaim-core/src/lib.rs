//! reclaim-core - policy-driven scan, trash and undo engine.
//!
//! # Overview
//!
//! The engine discovers reclaimable space (caches, logs, browser data,
//! duplicate content, oversized files, application remnants), moves items into
//! a recoverable holding area, and remembers the most recent batch so it can be
//! put back within a bounded window.
//!
//! # Architecture
//!
//! - **Failure isolation**: every per-item step yields a success or a counted
//!   failure; a bad item never aborts its batch.
//! - **Configuration snapshots**: [`EngineConfig`] is loaded once and passed
//!   into each operation, so concurrent operations never observe different
//!   rule sets mid-scan.
//! - **Cooperative cancellation**: long walks poll a
//!   [`CancellationToken`](tokio_util::sync::CancellationToken) per entry.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.reclaim/
//! ├── config.toml   # EngineConfig
//! └── undo.json     # Journal of the current undo window
//! ```

pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod events;
pub mod filters;
pub mod matcher;
pub mod paths;
pub mod retention;
pub mod scanner;
pub mod size;
pub mod sweep;
pub mod targets;
pub mod trash;
pub mod undo;

pub use config::{EngineConfig, ScanConfig};
pub use duplicates::DuplicateDetector;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use events::{EventSink, LogSink, NullSink};
pub use matcher::PathMatcher;
pub use paths::*;
pub use retention::RetentionPolicy;
pub use scanner::{GentlePacing, IncrementalScanner, ScanHandle, ScanOptions, ScanSummary};
pub use sweep::{Candidate, DirectoryReclaimer, SweepPolicy};
pub use targets::{AppTarget, CleanupKind, Operation, ResolvedTarget, TargetTemplate};
pub use trash::{HoldingArea, ReclaimFailure, Reclaimer, TrashDir};
pub use undo::{UndoJournal, UndoLedger};

pub use reclaim_schema as schema;
