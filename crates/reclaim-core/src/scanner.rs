//! Cancellable oversized-file walker.
//!
//! The walk runs as its own task and streams [`BigFileRecord`]s in fixed-size
//! batches over a bounded channel, so a slow consumer slows the walk down.
//! Cancellation is checked before every entry, including entries inside a
//! package being measured. Batches already sent stay valid; the partial
//! batch in hand when cancellation lands is discarded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::Stream;
use reclaim_schema::BigFileRecord;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::error::{EngineError, Result};
use crate::filters::{has_package_extension, is_hidden};
use crate::size;

/// Batches buffered between the walker and its consumer.
const CHANNEL_DEPTH: usize = 4;

/// Deliberate slowdown applied every `every` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GentlePacing {
    pub every: usize,
    pub pause: Duration,
}

/// Parameters for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Files at or above this many bytes are reported.
    pub min_bytes: u64,
    pub include_hidden: bool,
    /// Prune package directories entirely instead of reporting them as one item.
    pub skip_packages: bool,
    /// Directories never descended into.
    pub excluded_subtrees: Vec<PathBuf>,
    pub batch_size: usize,
    /// Entries visited between cooperative yields.
    pub yield_every: usize,
    pub gentle: Option<GentlePacing>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        crate::EngineConfig::default().scan_options(false)
    }
}

impl ScanOptions {
    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EngineError::invalid("batch size must be at least 1"));
        }
        if self.yield_every == 0 {
            return Err(EngineError::invalid("yield cadence must be at least 1"));
        }
        if self.gentle.is_some_and(|g| g.every == 0) {
            return Err(EngineError::invalid("gentle cadence must be at least 1"));
        }
        Ok(())
    }

    fn is_excluded_subtree(&self, path: &Path) -> bool {
        self.excluded_subtrees.iter().any(|s| path.starts_with(s))
    }
}

/// What the walk did, available once it ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub visited: u64,
    pub matched: u64,
    pub batches: u64,
    pub cancelled: bool,
}

/// Entry point for oversized-file scans.
#[derive(Debug)]
pub struct IncrementalScanner;

impl IncrementalScanner {
    /// Spawn a walk over `scopes` on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for a zero batch size or cadence.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(scopes: Vec<PathBuf>, options: ScanOptions) -> Result<ScanHandle> {
        Self::start_with_cancel(scopes, options, CancellationToken::new())
    }

    /// Like [`start`](Self::start), stopping when `cancel` (or a parent of it) fires.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for a zero batch size or cadence.
    pub fn start_with_cancel(
        scopes: Vec<PathBuf>,
        options: ScanOptions,
        cancel: CancellationToken,
    ) -> Result<ScanHandle> {
        options.validate()?;
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let walk = Walk {
            options,
            cancel: cancel.clone(),
            tx,
            summary: ScanSummary::default(),
        };
        let task = tokio::spawn(walk.run(scopes));
        Ok(ScanHandle { rx, cancel, task })
    }
}

/// The consumer's side of a running scan.
#[derive(Debug)]
pub struct ScanHandle {
    rx: mpsc::Receiver<Vec<BigFileRecord>>,
    cancel: CancellationToken,
    task: JoinHandle<ScanSummary>,
}

impl ScanHandle {
    /// Request a prompt stop. Batches already received remain valid.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next batch, or `None` once the walk has ended.
    pub async fn next_batch(&mut self) -> Option<Vec<BigFileRecord>> {
        self.rx.recv().await
    }

    /// Batches as a stream. Keep a [`cancellation_token`](Self::cancellation_token) to stop it.
    pub fn into_stream(self) -> impl Stream<Item = Vec<BigFileRecord>> + Unpin {
        ReceiverStream::new(self.rx)
    }

    /// Drain every remaining batch and wait for the walk to finish.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TaskJoin`] if the walk task panicked.
    pub async fn collect(mut self) -> Result<(Vec<BigFileRecord>, ScanSummary)> {
        let mut records = Vec::new();
        while let Some(batch) = self.rx.recv().await {
            records.extend(batch);
        }
        let summary = self.task.await?;
        Ok((records, summary))
    }
}

struct Walk {
    options: ScanOptions,
    cancel: CancellationToken,
    tx: mpsc::Sender<Vec<BigFileRecord>>,
    summary: ScanSummary,
}

enum Flow {
    Continue,
    Stop,
}

impl Walk {
    async fn run(mut self, scopes: Vec<PathBuf>) -> ScanSummary {
        let mut batch = Vec::with_capacity(self.options.batch_size);

        for scope in &scopes {
            if let Flow::Stop = self.walk_scope(scope, &mut batch).await {
                tracing::info!(
                    visited = self.summary.visited,
                    matched = self.summary.matched,
                    "Large file scan stopped early"
                );
                return self.summary;
            }
        }

        if !batch.is_empty() {
            let _ = self.emit(std::mem::take(&mut batch)).await;
        }
        tracing::info!(
            visited = self.summary.visited,
            matched = self.summary.matched,
            batches = self.summary.batches,
            "Large file scan finished"
        );
        self.summary
    }

    async fn walk_scope(&mut self, scope: &Path, batch: &mut Vec<BigFileRecord>) -> Flow {
        let mut walker = WalkDir::new(scope).follow_links(false).into_iter();
        // Package being measured. Its contents follow it contiguously in the walk.
        let mut package: Option<BigFileRecord> = None;

        loop {
            if self.cancel.is_cancelled() {
                self.summary.cancelled = true;
                return Flow::Stop;
            }
            let entry = match walker.next() {
                None => {
                    return match package.take() {
                        Some(record) => self.push(record, batch).await,
                        None => Flow::Continue,
                    };
                }
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            self.summary.visited += 1;
            self.pace().await;

            let path = entry.path();
            let is_dir = entry.file_type().is_dir();

            if package.as_ref().is_some_and(|p| !path.starts_with(&p.path)) {
                if let Some(record) = package.take() {
                    if let Flow::Stop = self.push(record, batch).await {
                        return Flow::Stop;
                    }
                }
            }

            if entry.depth() > 0 && !self.options.include_hidden && is_hidden(entry.file_name()) {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            if let Some(record) = package.as_mut() {
                if entry.file_type().is_file() {
                    if let Ok(meta) = entry.metadata() {
                        record.size = record.size.saturating_add(size::allocated_size(&meta));
                    }
                }
                continue;
            }

            let record = if is_dir {
                if self.options.is_excluded_subtree(path) {
                    tracing::debug!(path = %path.display(), "Pruned excluded subtree");
                    walker.skip_current_dir();
                    continue;
                }
                if entry.depth() == 0 || !has_package_extension(path) {
                    continue;
                }
                if self.options.skip_packages {
                    walker.skip_current_dir();
                    continue;
                }
                package = Some(BigFileRecord {
                    path: path.to_path_buf(),
                    size: 0,
                    is_package: true,
                });
                continue;
            } else if entry.file_type().is_file() {
                let Ok(meta) = entry.metadata() else { continue };
                BigFileRecord {
                    path: path.to_path_buf(),
                    size: meta.len(),
                    is_package: false,
                }
            } else {
                continue;
            };

            if let Flow::Stop = self.push(record, batch).await {
                return Flow::Stop;
            }
        }
    }

    /// Keep `record` if it meets the threshold, sending the batch once full.
    async fn push(&mut self, record: BigFileRecord, batch: &mut Vec<BigFileRecord>) -> Flow {
        if record.size < self.options.min_bytes {
            return Flow::Continue;
        }
        self.summary.matched += 1;
        batch.push(record);

        if batch.len() >= self.options.batch_size {
            let full = std::mem::replace(batch, Vec::with_capacity(self.options.batch_size));
            return self.emit(full).await;
        }
        Flow::Continue
    }

    /// Cooperative yield plus the optional gentle pause.
    async fn pace(&self) {
        let visited = self.summary.visited;
        if visited % self.options.yield_every as u64 == 0 {
            tokio::task::yield_now().await;
        }
        if let Some(gentle) = self.options.gentle {
            if visited % gentle.every as u64 == 0 {
                tokio::time::sleep(gentle.pause).await;
            }
        }
    }

    async fn emit(&mut self, batch: Vec<BigFileRecord>) -> Flow {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                self.summary.cancelled = true;
                Flow::Stop
            }
            sent = self.tx.send(batch) => match sent {
                Ok(()) => {
                    self.summary.batches += 1;
                    Flow::Continue
                }
                Err(_) => {
                    tracing::debug!("Scan consumer went away");
                    Flow::Stop
                }
            }
        }
    }
}
