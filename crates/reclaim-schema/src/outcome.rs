//! Per-operation accumulators.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An item moved into the holding area.
///
/// Created once per successful reclaim and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrashedItem {
    /// Where the item lived before it was reclaimed.
    pub original_path: PathBuf,
    /// Where the item lives now, inside the holding area.
    pub trashed_path: PathBuf,
}

impl TrashedItem {
    /// Pair an original location with its holding-area location.
    pub fn new(original_path: impl Into<PathBuf>, trashed_path: impl Into<PathBuf>) -> Self {
        Self {
            original_path: original_path.into(),
            trashed_path: trashed_path.into(),
        }
    }
}

/// Aggregate outcome of one removing operation.
///
/// Sub-results from parallel or per-target passes combine with
/// [`OperationResult::merge`]: counters add, trashed lists concatenate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Items successfully moved to the holding area.
    pub items_removed: usize,
    /// Bytes freed by the removed items, as estimated before removal.
    pub bytes_freed: u64,
    /// Items that could not be moved.
    pub items_failed: usize,
    /// Holding-area records, in processing order.
    pub trashed: Vec<TrashedItem>,
}

impl OperationResult {
    /// A fresh, empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successfully reclaimed item.
    pub fn record_removed(&mut self, item: TrashedItem, bytes: u64) {
        self.items_removed += 1;
        self.bytes_freed = self.bytes_freed.saturating_add(bytes);
        self.trashed.push(item);
    }

    /// Count one item that could not be reclaimed.
    pub fn record_failed(&mut self) {
        self.items_failed += 1;
    }

    /// Fold `other` into `self`.
    pub fn absorb(&mut self, other: Self) {
        self.items_removed += other.items_removed;
        self.bytes_freed = self.bytes_freed.saturating_add(other.bytes_freed);
        self.items_failed += other.items_failed;
        self.trashed.extend(other.trashed);
    }

    /// Combine two results. Totals are order-independent; `trashed` keeps `self` first.
    pub fn merge(mut self, other: Self) -> Self {
        self.absorb(other);
        self
    }

    /// True when nothing was attempted.
    pub fn is_empty(&self) -> bool {
        self.items_removed == 0 && self.items_failed == 0
    }
}

impl std::iter::Sum for OperationResult {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::new(), Self::merge)
    }
}
