//! Time-bounded undo of the most recent removal.
//!
//! Only one window exists at a time: tracking a new batch replaces whatever
//! was pending, even if its countdown had not run out. Expiry only forgets
//! the items; their copies stay in the holding area.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reclaim_schema::TrashedItem;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::trash::HoldingArea;

/// The restorable items of the latest operation and the time left to restore them.
#[derive(Debug)]
pub struct UndoLedger {
    holding: Arc<dyn HoldingArea>,
    items: Vec<TrashedItem>,
    remaining: u64,
}

impl UndoLedger {
    pub fn new(holding: Arc<dyn HoldingArea>) -> Self {
        Self {
            holding,
            items: Vec::new(),
            remaining: 0,
        }
    }

    /// Rebuild from a persisted window. An expired journal gives an empty ledger.
    pub fn from_journal(holding: Arc<dyn HoldingArea>, journal: UndoJournal, now: DateTime<Utc>) -> Self {
        let mut ledger = Self::new(holding);
        let remaining = journal.remaining_at(now);
        if remaining > 0 {
            ledger.track(journal.items, remaining);
        }
        ledger
    }

    /// Start a new window, superseding any previous one.
    pub fn track(&mut self, items: Vec<TrashedItem>, window_secs: u64) {
        if !self.items.is_empty() {
            tracing::debug!(
                superseded = self.items.len(),
                remaining = self.remaining,
                "Replacing pending undo window"
            );
        }
        if items.is_empty() || window_secs == 0 {
            self.clear();
            return;
        }
        self.items = items;
        self.remaining = window_secs;
    }

    /// One second elapsed.
    pub fn tick(&mut self) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            tracing::debug!(items = self.items.len(), "Undo window expired");
            self.items.clear();
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    pub fn items(&self) -> &[TrashedItem] {
        &self.items
    }

    pub fn is_active(&self) -> bool {
        !self.items.is_empty()
    }

    fn clear(&mut self) {
        self.items.clear();
        self.remaining = 0;
    }

    /// Put every tracked item back where it came from. Returns how many made it.
    ///
    /// Anything now occupying an original path is moved into the holding area
    /// first. Items fail independently, and the window is closed afterwards
    /// regardless of outcome.
    pub fn restore(&mut self) -> usize {
        let items = std::mem::take(&mut self.items);
        self.remaining = 0;

        let total = items.len();
        let restored = items
            .iter()
            .filter(|item| match restore_one(&*self.holding, item) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        path = %item.original_path.display(),
                        error = %e,
                        "Could not restore item"
                    );
                    false
                }
            })
            .count();

        tracing::info!(restored, failed = total - restored, "Undo finished");
        restored
    }

    /// Drive [`tick`](Self::tick) once a second until `cancel` fires.
    ///
    /// A tick that lands while the ledger is busy (mid-restore) is skipped.
    pub fn spawn_countdown(ledger: Arc<Mutex<Self>>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Undo countdown stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        match ledger.try_lock() {
                            Ok(mut ledger) => ledger.tick(),
                            Err(TryLockError::WouldBlock) => {}
                            Err(TryLockError::Poisoned(_)) => {
                                tracing::error!("Undo ledger poisoned, countdown stopping");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }
}

fn restore_one(holding: &dyn HoldingArea, item: &TrashedItem) -> io::Result<()> {
    // Without the held copy there is nothing to restore, so leave any occupant alone.
    fs::symlink_metadata(&item.trashed_path)?;

    if let Some(parent) = item.original_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let displaced = if fs::symlink_metadata(&item.original_path).is_ok() {
        let displaced = holding.stash(&item.original_path)?;
        tracing::debug!(
            path = %item.original_path.display(),
            displaced = %displaced.display(),
            "Displaced occupant before restore"
        );
        Some(displaced)
    } else {
        None
    };

    let Err(e) = holding.unstash(&item.trashed_path, &item.original_path) else {
        return Ok(());
    };
    // Leave the path as we found it.
    if let Some(displaced) = displaced {
        if let Err(back) = holding.unstash(&displaced, &item.original_path) {
            tracing::error!(
                path = %item.original_path.display(),
                displaced = %displaced.display(),
                error = %back,
                "Could not return displaced occupant"
            );
        }
    }
    Err(e)
}

/// On-disk copy of the current window so a later process can still undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoJournal {
    pub items: Vec<TrashedItem>,
    pub window_secs: u64,
    pub tracked_at: DateTime<Utc>,
}

impl UndoJournal {
    pub fn new(items: Vec<TrashedItem>, window_secs: u64) -> Self {
        Self {
            items,
            window_secs,
            tracked_at: Utc::now(),
        }
    }

    /// Seconds left at `now`, clamped to zero. A clock that moved backwards counts as no time elapsed.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = u64::try_from((now - self.tracked_at).num_seconds()).unwrap_or(0);
        self.window_secs.saturating_sub(elapsed)
    }

    /// Read a journal. A missing file is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the journal, creating its directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Remove a journal if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn discard(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
