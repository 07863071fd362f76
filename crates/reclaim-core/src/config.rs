//! Engine configuration snapshot.
//!
//! Loaded once per invocation from `$RECLAIM_HOME/config.toml` and passed into
//! every operation by value. A missing file means defaults.
//!
//! ```toml
//! retention = "safe"
//! custom_keep_days = 0
//! include_hidden = false
//!
//! [[exclusions]]
//! id = "xcode"
//! kind = "prefix"
//! value = "/Users/me/Library/Caches/com.apple.dt.Xcode"
//!
//! [scan]
//! min_big_file_mb = 500
//! gentle = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reclaim_schema::{
    DEFAULT_UNDO_WINDOW_SECS, ExclusionSet, RetentionLevel, effective_keep_days,
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::scanner::{GentlePacing, ScanOptions};

const MIB: u64 = 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Named risk level.
    pub retention: RetentionLevel,
    /// User override in days; the longer of this and the level's window applies.
    pub custom_keep_days: u32,
    /// Consider dot-files and dot-directories.
    pub include_hidden: bool,
    /// Treat package directories (`.app`, `.framework`, ...) as opaque.
    pub skip_packages: bool,
    /// How long a removal stays restorable.
    pub undo_window_secs: u64,
    /// Override for the holding area location.
    pub trash_dir: Option<PathBuf>,
    /// Oversized-file scan tuning.
    pub scan: ScanConfig,
    /// Paths and identifiers never touched.
    pub exclusions: ExclusionSet,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention: RetentionLevel::default(),
            custom_keep_days: 0,
            include_hidden: false,
            skip_packages: true,
            exclusions: ExclusionSet::new(),
            undo_window_secs: DEFAULT_UNDO_WINDOW_SECS,
            trash_dir: None,
            scan: ScanConfig::default(),
        }
    }
}

/// `[scan]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Threshold in MiB. Signed so a negative value can be rejected rather than wrapped.
    pub min_big_file_mb: i64,
    /// Records per emitted batch.
    pub batch_size: usize,
    /// Entries visited between cooperative yields.
    pub yield_every: usize,
    /// Throttle the walk to reduce system load.
    pub gentle: bool,
    /// Entries visited between gentle-mode pauses.
    pub gentle_every: usize,
    /// Length of each gentle-mode pause.
    pub gentle_pause_ms: u64,
    /// Subtrees never descended into.
    pub excluded_subtrees: Vec<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_big_file_mb: 500,
            batch_size: 128,
            yield_every: 256,
            gentle: false,
            gentle_every: 2048,
            gentle_pause_ms: 2,
            excluded_subtrees: ["/proc", "/sys", "/dev", "/System"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Load from `$RECLAIM_HOME/config.toml`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or validated.
    pub fn load() -> Result<Self> {
        match crate::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|source| EngineError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), rules = config.exclusions.len(), "Loaded config");
        Ok(config)
    }

    /// Reject values no operation can honour.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.scan.min_big_file_mb < 0 {
            return Err(EngineError::invalid(format!(
                "scan.min_big_file_mb must not be negative (got {})",
                self.scan.min_big_file_mb
            )));
        }
        if self.scan.batch_size == 0 {
            return Err(EngineError::invalid("scan.batch_size must be at least 1"));
        }
        if self.scan.yield_every == 0 {
            return Err(EngineError::invalid("scan.yield_every must be at least 1"));
        }
        if self.scan.gentle_every == 0 {
            return Err(EngineError::invalid("scan.gentle_every must be at least 1"));
        }
        if let Some(rule) = self.exclusions.iter().find(|r| r.value.is_empty()) {
            return Err(EngineError::invalid(format!(
                "exclusion rule '{}' has an empty value",
                rule.id
            )));
        }
        Ok(())
    }

    /// Effective keep window in days.
    pub fn keep_days(&self) -> u32 {
        effective_keep_days(self.retention, self.custom_keep_days)
    }

    /// Oversized-file threshold in bytes.
    pub fn min_big_file_bytes(&self) -> u64 {
        (self.scan.min_big_file_mb.max(0) as u64).saturating_mul(MIB)
    }

    /// Scanner options derived from this snapshot.
    ///
    /// `gentle` forces throttling on even when the config leaves it off.
    pub fn scan_options(&self, gentle: bool) -> ScanOptions {
        let pacing = (gentle || self.scan.gentle).then(|| GentlePacing {
            every: self.scan.gentle_every,
            pause: Duration::from_millis(self.scan.gentle_pause_ms),
        });
        ScanOptions {
            min_bytes: self.min_big_file_bytes(),
            include_hidden: self.include_hidden,
            skip_packages: self.skip_packages,
            excluded_subtrees: self.scan.excluded_subtrees.clone(),
            batch_size: self.scan.batch_size,
            yield_every: self.scan.yield_every,
            gentle: pacing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use reclaim_schema::RuleKind;

    #[test]
    fn parses_full_document() {
        let config: EngineConfig = toml::from_str(
            r#"
            retention = "safe"
            custom_keep_days = 10
            include_hidden = true

            [[exclusions]]
            id = "xcode"
            kind = "prefix"
            value = "/Users/me/Library/Caches/com.apple.dt.Xcode"

            [[exclusions]]
            id = "slack"
            kind = "identifier"
            value = "com.tinyspeck.slackmacgap"

            [scan]
            min_big_file_mb = 100
            gentle = true
            "#,
        )
        .unwrap();

        assert_eq!(config.retention, RetentionLevel::Safe);
        assert_eq!(config.keep_days(), 10);
        assert!(config.include_hidden);
        assert_eq!(config.exclusions.len(), 2);
        assert_eq!(
            config.exclusions.get(&"xcode".into()).unwrap().kind,
            RuleKind::PathPrefix
        );
        assert_eq!(config.min_big_file_bytes(), 100 * MIB);
        assert_eq!(config.scan.batch_size, 128);
        assert!(config.scan_options(false).gentle.is_some());
    }

    #[test]
    fn empty_document_is_default() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.keep_days(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut config = EngineConfig::default();
        config.scan.min_big_file_mb = -1;
        assert_matches!(config.validate(), Err(EngineError::InvalidConfig(_)));
    }

    #[test]
    fn zero_batch_is_rejected() {
        let mut config = EngineConfig::default();
        config.scan.batch_size = 0;
        assert_matches!(config.validate(), Err(EngineError::InvalidConfig(_)));
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "retention = \"reckless\"").unwrap();

        assert_matches!(
            EngineConfig::load_from(&path),
            Err(EngineError::Config { .. })
        );
    }

    #[test]
    fn gentle_flag_overrides_config() {
        let config = EngineConfig::default();
        assert!(config.scan_options(false).gentle.is_none());
        let pacing = config.scan_options(true).gentle.unwrap();
        assert_eq!(pacing.every, 2048);
        assert_eq!(pacing.pause, Duration::from_millis(2));
    }
}
