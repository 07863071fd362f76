//! Shared types for the reclaim cleanup engine.
//!
//! Everything in this crate is plain data plus the pure invariants that go
//! with it: rule sets, retention levels, per-operation accumulators, duplicate
//! groups, scan records and the staged deletion tree. Filesystem side effects
//! live in `reclaim-core`.

pub mod event;
pub mod hash;
pub mod outcome;
pub mod preview;
pub mod retention;
pub mod rules;
pub mod scan;

// Re-exports
pub use event::{CleanupEvent, OperationKind};
pub use hash::{ContentHash, DuplicateGroup};
pub use outcome::{OperationResult, TrashedItem};
pub use preview::{NodeId, PreviewError, PreviewNode, PreviewTree};
pub use retention::{RetentionLevel, effective_keep_days};
pub use rules::{ExclusionRule, ExclusionSet, RuleId, RuleKind};
pub use scan::BigFileRecord;

/// Default length of an undo window, in seconds (15 minutes).
pub const DEFAULT_UNDO_WINDOW_SECS: u64 = 900;
