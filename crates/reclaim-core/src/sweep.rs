//! The generic "reclaim the children of a directory" primitive.
//!
//! Every cleanup variant is a list of target directories fed through
//! [`DirectoryReclaimer`]. Only direct children are considered; walking into
//! nested targets is the caller's job (see [`crate::targets`]).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use reclaim_schema::OperationResult;

use crate::config::EngineConfig;
use crate::filters::is_hidden;
use crate::matcher::PathMatcher;
use crate::retention;
use crate::size;
use crate::trash::Reclaimer;

/// Filters applied to every child before it is reclaimed.
#[derive(Debug, Clone)]
pub struct SweepPolicy {
    pub include_hidden: bool,
    pub cutoff: Option<DateTime<Utc>>,
    pub matcher: PathMatcher,
}

impl SweepPolicy {
    /// Policy with the cutoff computed from the current time.
    pub fn new(include_hidden: bool, keep_days: u32, matcher: PathMatcher) -> Self {
        Self::at(include_hidden, keep_days, matcher, Utc::now())
    }

    /// Policy with the cutoff computed from `now`.
    pub fn at(include_hidden: bool, keep_days: u32, matcher: PathMatcher, now: DateTime<Utc>) -> Self {
        Self {
            include_hidden,
            cutoff: retention::cutoff(keep_days, now),
            matcher,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.include_hidden,
            config.keep_days(),
            PathMatcher::new(config.exclusions.clone()),
        )
    }

    /// Whether a child passes hidden, exclusion and age filters.
    pub fn admits(&self, path: &Path, identifier: Option<&str>, modified: Option<SystemTime>) -> bool {
        if !self.include_hidden && path.file_name().is_some_and(is_hidden) {
            tracing::trace!(path = %path.display(), "Skipping hidden");
            return false;
        }
        if self.matcher.should_exclude(path, identifier) {
            tracing::debug!(path = %path.display(), "Excluded by rule");
            return false;
        }
        if !retention::is_eligible(modified, self.cutoff) {
            tracing::trace!(path = %path.display(), "Within keep window");
            return false;
        }
        true
    }
}

/// A child that would be reclaimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Reclaims the eligible direct children of target directories.
#[derive(Debug, Clone)]
pub struct DirectoryReclaimer {
    reclaimer: Reclaimer,
}

impl DirectoryReclaimer {
    pub fn new(reclaimer: Reclaimer) -> Self {
        Self { reclaimer }
    }

    pub fn reclaimer(&self) -> &Reclaimer {
        &self.reclaimer
    }

    /// Children of `directory` that [`reclaim_children`](Self::reclaim_children) would move.
    ///
    /// A missing directory, or a path that is not a directory, has no
    /// children. Unreadable entries are skipped.
    pub fn plan_children(
        &self,
        directory: &Path,
        policy: &SweepPolicy,
        identifier: Option<&str>,
    ) -> Vec<Candidate> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::trace!(dir = %directory.display(), error = %e, "Target not readable, nothing to do");
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            if !policy.admits(&path, identifier, modified) {
                continue;
            }
            let size = size::estimate(&path, policy.include_hidden);
            candidates.push(Candidate {
                path,
                size,
                modified,
            });
        }
        candidates
    }

    /// Move every eligible child of `directory` into the holding area.
    ///
    /// Each child succeeds or fails on its own. `identifier` is handed to
    /// identifier rules (for instance a sandbox container's name).
    pub fn reclaim_children(
        &self,
        directory: &Path,
        policy: &SweepPolicy,
        identifier: Option<&str>,
    ) -> OperationResult {
        let mut result = OperationResult::new();
        for candidate in self.plan_children(directory, policy, identifier) {
            self.reclaimer
                .reclaim_into(&candidate.path, candidate.size, &mut result);
        }
        if !result.is_empty() {
            tracing::debug!(
                dir = %directory.display(),
                removed = result.items_removed,
                failed = result.items_failed,
                bytes = result.bytes_freed,
                "Swept directory"
            );
        }
        result
    }
}
