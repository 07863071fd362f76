//! Engine facade: one configuration snapshot, one holding area, one undo window.
//!
//! Blocking filesystem work runs on `spawn_blocking` so callers on an async
//! runtime are never stalled by a long sweep or hash pass.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use reclaim_schema::{
    CleanupEvent, DuplicateGroup, OperationKind, OperationResult, PreviewNode, PreviewTree,
};
use tokio::task::{JoinHandle, spawn_blocking};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::duplicates::DuplicateDetector;
use crate::error::{EngineError, Result};
use crate::events::{EventSink, NullSink};
use crate::scanner::{IncrementalScanner, ScanHandle};
use crate::sweep::{DirectoryReclaimer, SweepPolicy};
use crate::targets::{AppTarget, CleanupKind, Operation};
use crate::trash::{HoldingArea, Reclaimer, TrashDir};
use crate::undo::{UndoJournal, UndoLedger};

#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    home: PathBuf,
    holding: Arc<dyn HoldingArea>,
    ledger: Arc<Mutex<UndoLedger>>,
    events: Arc<dyn EventSink>,
    journal: Option<PathBuf>,
}

impl Engine {
    /// An engine over an explicit home and holding area, with no journal and no events.
    pub fn new(config: EngineConfig, home: impl Into<PathBuf>, holding: Arc<dyn HoldingArea>) -> Self {
        Self {
            config: Arc::new(config),
            home: home.into(),
            ledger: Arc::new(Mutex::new(UndoLedger::new(holding.clone()))),
            holding,
            events: Arc::new(NullSink),
            journal: None,
        }
    }

    /// The engine for the current user: real home, configured or platform
    /// trash, and the journal under `$RECLAIM_HOME`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be resolved, the trash
    /// cannot be opened, or an existing journal cannot be read.
    pub fn for_user(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let home = crate::user_home().ok_or(EngineError::NoHome)?;
        let trash = match &config.trash_dir {
            Some(dir) => TrashDir::open(dir)?,
            None => TrashDir::open_default()?,
        };
        tracing::debug!(home = %home.display(), trash = %trash.root().display(), "Engine ready");
        let engine = Self::new(config, home, Arc::new(trash));
        match crate::journal_path() {
            Some(path) => engine.with_journal(path),
            None => Ok(engine),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Persist the undo window at `path`, resuming one already there.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing journal cannot be read or the ledger lock is poisoned.
    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(journal) = UndoJournal::load(&path)? {
            let resumed = UndoLedger::from_journal(self.holding.clone(), journal, Utc::now());
            if resumed.is_active() {
                tracing::debug!(
                    items = resumed.items().len(),
                    remaining = resumed.remaining_seconds(),
                    "Resumed undo window"
                );
            }
            *self.lock_ledger()? = resumed;
        }
        self.journal = Some(path);
        Ok(self)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn ledger(&self) -> Arc<Mutex<UndoLedger>> {
        self.ledger.clone()
    }

    fn lock_ledger(&self) -> Result<MutexGuard<'_, UndoLedger>> {
        self.ledger.lock().map_err(|_| EngineError::LedgerPoisoned)
    }

    fn reclaimer(&self) -> Reclaimer {
        Reclaimer::new(self.holding.clone())
    }

    fn sweeper(&self) -> DirectoryReclaimer {
        DirectoryReclaimer::new(self.reclaimer())
    }

    /// Filters for a sweep starting now.
    pub fn policy(&self) -> SweepPolicy {
        SweepPolicy::from_config(&self.config)
    }

    /// Stage `op` as a preview tree without touching anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the planning task fails.
    pub async fn plan(&self, op: Operation) -> Result<PreviewTree> {
        let home = self.home.clone();
        let sweeper = self.sweeper();
        let policy = self.policy();
        spawn_blocking(move || build_preview(&op, &home, &sweeper, &policy)).await?
    }

    /// Run `op`, track its removals for undo and emit its event.
    ///
    /// # Errors
    ///
    /// Returns an error if the background task fails or the ledger is poisoned.
    /// Per-item failures are counted in the result instead.
    pub async fn run(&self, op: Operation) -> Result<OperationResult> {
        let home = self.home.clone();
        let sweeper = self.sweeper();
        let policy = self.policy();
        let (kind, source) = (op.kind(), op.source());
        tracing::info!(operation = %op, "Starting operation");
        let result = spawn_blocking(move || op.run(&home, &sweeper, &policy)).await?;
        self.finish(result, kind, source)
    }

    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn clean(&self, kind: CleanupKind) -> Result<OperationResult> {
        self.run(Operation::Clean(kind)).await
    }

    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn uninstall(&self, app: AppTarget) -> Result<OperationResult> {
        self.run(Operation::Uninstall(app)).await
    }

    /// Move an explicit list of paths into the holding area.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn trash_paths(
        &self,
        paths: Vec<PathBuf>,
        kind: OperationKind,
        source: Option<String>,
    ) -> Result<OperationResult> {
        let reclaimer = self.reclaimer();
        let result = spawn_blocking(move || reclaimer.reclaim_paths(&paths)).await?;
        self.finish(result, kind, source)
    }

    /// Reclaim exactly the selected leaves of a staged plan.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn execute_preview(&self, tree: &PreviewTree, source: Option<String>) -> Result<OperationResult> {
        let paths = tree.selected_leaf_paths();
        tracing::debug!(selected = paths.len(), "Executing preview");
        self.trash_paths(paths, OperationKind::Selection, source).await
    }

    /// Find duplicate groups under `roots` with this engine's hidden and package settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan task fails.
    pub async fn find_duplicates(
        &self,
        roots: Vec<PathBuf>,
        cancel: CancellationToken,
    ) -> Result<Vec<DuplicateGroup>> {
        let detector = DuplicateDetector::new(self.config.include_hidden, self.config.skip_packages)
            .with_cancel(cancel);
        Ok(spawn_blocking(move || detector.scan(&roots)).await?)
    }

    /// Start an oversized-file scan. Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the scan settings are unusable.
    pub fn find_big_files(
        &self,
        scopes: Vec<PathBuf>,
        gentle: bool,
        cancel: CancellationToken,
    ) -> Result<ScanHandle> {
        self.config.validate()?;
        IncrementalScanner::start_with_cancel(scopes, self.config.scan_options(gentle), cancel)
    }

    /// Restore the current undo window. Returns how many items came back.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger is poisoned or the restore task fails.
    pub async fn undo(&self) -> Result<usize> {
        let ledger = self.ledger.clone();
        let restored = spawn_blocking(move || {
            ledger
                .lock()
                .map(|mut l| l.restore())
                .map_err(|_| EngineError::LedgerPoisoned)
        })
        .await??;
        if let Some(path) = &self.journal {
            UndoJournal::discard(path)?;
        }
        Ok(restored)
    }

    /// Tick the undo window down in the background until `cancel` fires.
    pub fn spawn_countdown(&self, cancel: CancellationToken) -> JoinHandle<()> {
        UndoLedger::spawn_countdown(self.ledger.clone(), cancel)
    }

    fn finish(
        &self,
        result: OperationResult,
        kind: OperationKind,
        source: Option<String>,
    ) -> Result<OperationResult> {
        if !result.trashed.is_empty() {
            let window = self.config.undo_window_secs;
            self.lock_ledger()?.track(result.trashed.clone(), window);
            if let Some(path) = &self.journal {
                let journal = UndoJournal::new(result.trashed.clone(), window);
                if let Err(e) = journal.save(path) {
                    tracing::warn!(path = %path.display(), error = %e, "Could not persist undo journal");
                }
            }
        }
        if result.items_removed > 0 {
            self.events
                .emit(&CleanupEvent::now(kind, result.bytes_freed, source));
        }
        Ok(result)
    }
}

fn build_preview(
    op: &Operation,
    home: &Path,
    sweeper: &DirectoryReclaimer,
    policy: &SweepPolicy,
) -> Result<PreviewTree> {
    let mut tree = PreviewTree::new();
    let root = tree.add_root(PreviewNode::group(op.to_string()));

    let leaf = |c: &crate::sweep::Candidate| {
        let title = c
            .path
            .file_name()
            .map_or_else(|| c.path.display().to_string(), |n| n.to_string_lossy().into_owned());
        PreviewNode::item(title, &c.path, c.size)
    };

    match op {
        Operation::Clean(kind) => {
            for (target, candidates) in kind.plan(home, sweeper, policy) {
                let mut heading = PreviewNode::group(target.directory.display().to_string());
                if let Some(id) = target.identifier {
                    heading = heading.with_detail(id);
                }
                let group = tree.add_child(root, heading)?;
                for candidate in &candidates {
                    tree.add_child(group, leaf(candidate))?;
                }
            }
        }
        Operation::Uninstall(app) => {
            for candidate in &app.plan(home, &policy.matcher) {
                tree.add_child(root, leaf(candidate))?;
            }
        }
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::tests::RecordingSink;
    use reclaim_schema::RetentionLevel;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        home: PathBuf,
        trash: Arc<TrashDir>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let trash = Arc::new(TrashDir::open(dir.path().join("trash")).unwrap());
        fs::create_dir_all(&home).unwrap();
        Fixture {
            _dir: dir,
            home,
            trash,
        }
    }

    fn advanced() -> EngineConfig {
        EngineConfig {
            retention: RetentionLevel::Advanced,
            ..EngineConfig::default()
        }
    }

    fn touch(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[tokio::test]
    async fn clean_tracks_emits_and_undoes() {
        let fx = fixture();
        touch(&fx.home.join("Library/Caches/a/blob"), b"aaaa");
        touch(&fx.home.join("Library/Caches/b"), b"bb");
        let sink = Arc::new(RecordingSink::default());
        let engine = Engine::new(advanced(), &fx.home, fx.trash.clone()).with_events(sink.clone());

        let result = engine.clean(CleanupKind::Caches).await.unwrap();

        assert_eq!(result.items_removed, 2);
        assert!(!fx.home.join("Library/Caches/b").exists());
        assert_eq!(engine.ledger().lock().unwrap().items().len(), 2);
        {
            let events = sink.events.lock().unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, OperationKind::Caches);
            assert_eq!(events[0].bytes_freed, result.bytes_freed);
        }

        assert_eq!(engine.undo().await.unwrap(), 2);
        assert_eq!(fs::read(fx.home.join("Library/Caches/a/blob")).unwrap(), b"aaaa");
        assert!(!engine.ledger().lock().unwrap().is_active());
    }

    #[tokio::test]
    async fn empty_operation_leaves_window_alone() {
        let fx = fixture();
        touch(&fx.home.join("Library/Logs/old.log"), b"log");
        let engine = Engine::new(advanced(), &fx.home, fx.trash.clone());

        engine.clean(CleanupKind::Logs).await.unwrap();
        let nothing = engine.clean(CleanupKind::BrowserData).await.unwrap();

        assert!(nothing.is_empty());
        assert_eq!(engine.ledger().lock().unwrap().items().len(), 1);
    }

    #[tokio::test]
    async fn preview_executes_only_selected_leaves() {
        let fx = fixture();
        touch(&fx.home.join("Library/Caches/keep"), b"keep");
        touch(&fx.home.join("Library/Caches/drop"), b"drop");
        let engine = Engine::new(advanced(), &fx.home, fx.trash.clone());

        let mut tree = engine.plan(Operation::Clean(CleanupKind::Caches)).await.unwrap();
        assert!(fx.home.join("Library/Caches/drop").exists());
        let keep = tree.find_path(&fx.home.join("Library/Caches/keep")).unwrap();
        assert!(!tree.toggle(keep).unwrap());

        let result = engine.execute_preview(&tree, None).await.unwrap();

        assert_eq!(result.items_removed, 1);
        assert!(fx.home.join("Library/Caches/keep").exists());
        assert!(!fx.home.join("Library/Caches/drop").exists());
    }

    #[tokio::test]
    async fn journal_survives_a_new_engine() {
        let fx = fixture();
        let journal = fx.home.join(".reclaim/undo.json");
        touch(&fx.home.join("Library/Caches/x"), b"x");

        let first = Engine::new(advanced(), &fx.home, fx.trash.clone())
            .with_journal(&journal)
            .unwrap();
        first.clean(CleanupKind::Caches).await.unwrap();
        assert!(journal.exists());
        drop(first);

        let second = Engine::new(advanced(), &fx.home, fx.trash.clone())
            .with_journal(&journal)
            .unwrap();
        assert!(second.ledger().lock().unwrap().remaining_seconds() > 0);
        assert_eq!(second.undo().await.unwrap(), 1);
        assert!(fx.home.join("Library/Caches/x").exists());
        assert!(!journal.exists());
    }

    #[tokio::test]
    async fn duplicates_found_and_trashed() {
        let fx = fixture();
        let docs = fx.home.join("Documents");
        touch(&docs.join("one.txt"), b"copy");
        touch(&docs.join("two.txt"), b"copy");
        let engine = Engine::new(advanced(), &fx.home, fx.trash.clone());

        let groups = engine
            .find_duplicates(vec![docs.clone()], CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);

        let redundant = groups[0].redundant().to_vec();
        let result = engine
            .trash_paths(redundant, OperationKind::Duplicates, None)
            .await
            .unwrap();
        assert_eq!(result.items_removed, 1);
        assert_eq!(fs::read_dir(&docs).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn big_file_scan_uses_config_threshold() {
        let fx = fixture();
        let mut config = advanced();
        config.scan.min_big_file_mb = 1;
        config.scan.excluded_subtrees.clear();
        fs::File::create(fx.home.join("big.iso"))
            .unwrap()
            .set_len(2 * 1024 * 1024)
            .unwrap();
        touch(&fx.home.join("small"), b"small");
        let engine = Engine::new(config, &fx.home, fx.trash.clone());

        let (records, _) = engine
            .find_big_files(vec![fx.home.clone()], false, CancellationToken::new())
            .unwrap()
            .collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, fx.home.join("big.iso"));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_closes_the_window() {
        let fx = fixture();
        touch(&fx.home.join("Library/Logs/app.log"), b"log");
        let config = EngineConfig {
            undo_window_secs: 3,
            ..advanced()
        };
        let engine = Engine::new(config, &fx.home, fx.trash.clone());
        engine.clean(CleanupKind::Logs).await.unwrap();
        let cancel = CancellationToken::new();

        let countdown = engine.spawn_countdown(cancel.clone());
        tokio::time::sleep(std::time::Duration::from_millis(3500)).await;
        cancel.cancel();
        countdown.await.unwrap();

        assert!(!engine.ledger().lock().unwrap().is_active());
        assert_eq!(engine.undo().await.unwrap(), 0);
        assert!(!fx.home.join("Library/Logs/app.log").exists());
    }

    #[tokio::test]
    async fn uninstall_plan_lists_remnants() {
        let fx = fixture();
        touch(&fx.home.join("Library/Caches/com.acme.tool/db"), b"db");
        touch(&fx.home.join(".config/Tool/rc"), b"rc");
        let engine = Engine::new(advanced(), &fx.home, fx.trash.clone());
        let app = AppTarget::new("Tool", Some("com.acme.tool".into())).unwrap();

        let tree = engine.plan(Operation::Uninstall(app.clone())).await.unwrap();
        assert_eq!(tree.selected_leaf_paths().len(), 2);

        let result = engine.uninstall(app).await.unwrap();
        assert_eq!(result.items_removed, 2);
    }
}
