//! Well-known cleanup locations and the closed set of operations over them.
//!
//! Each [`CleanupKind`] is nothing more than a fixed list of
//! [`TargetTemplate`]s resolved against the user's home and fed through the
//! same [`DirectoryReclaimer`] primitive. Uninstalling an application is the
//! one operation that names its paths directly.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use reclaim_schema::{OperationKind, OperationResult};

use crate::error::{EngineError, Result};
use crate::matcher::PathMatcher;
use crate::size;
use crate::sweep::{Candidate, DirectoryReclaimer, SweepPolicy};
use crate::trash::Reclaimer;

/// A target directory relative to the user's home.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetTemplate {
    /// A single directory whose children are swept.
    Direct(&'static str),
    /// Every child of `parent`, descended into `subpath`.
    ///
    /// The child's directory name doubles as the identifier handed to
    /// exclusion rules, so an identifier rule protects a whole container.
    PerContainer {
        parent: &'static str,
        subpath: &'static str,
    },
}

/// A resolved target directory and the identifier it is matched under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub directory: PathBuf,
    pub identifier: Option<String>,
}

impl TargetTemplate {
    /// Resolve against `home`. Missing intermediate directories resolve to nothing.
    pub fn expand(&self, home: &Path) -> Vec<ResolvedTarget> {
        match *self {
            Self::Direct(rel) => vec![ResolvedTarget {
                directory: home.join(rel),
                identifier: None,
            }],
            Self::PerContainer { parent, subpath } => {
                let Ok(entries) = fs::read_dir(home.join(parent)) else {
                    return Vec::new();
                };
                let mut containers: Vec<ResolvedTarget> = entries
                    .filter_map(std::result::Result::ok)
                    .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
                    .map(|e| ResolvedTarget {
                        directory: e.path().join(subpath),
                        identifier: Some(e.file_name().to_string_lossy().into_owned()),
                    })
                    .collect();
                containers.sort_by(|a, b| a.directory.cmp(&b.directory));
                containers
            }
        }
    }
}

const CACHE_TARGETS: &[TargetTemplate] = &[
    TargetTemplate::Direct("Library/Caches"),
    TargetTemplate::PerContainer {
        parent: "Library/Containers",
        subpath: "Data/Library/Caches",
    },
    TargetTemplate::PerContainer {
        parent: "Library/Group Containers",
        subpath: "Library/Caches",
    },
    TargetTemplate::Direct(".cache"),
];

const LOG_TARGETS: &[TargetTemplate] = &[
    TargetTemplate::Direct("Library/Logs"),
    TargetTemplate::PerContainer {
        parent: "Library/Containers",
        subpath: "Data/Library/Logs",
    },
    TargetTemplate::Direct(".local/state/log"),
];

const BROWSER_TARGETS: &[TargetTemplate] = &[
    TargetTemplate::Direct("Library/Caches/Google/Chrome"),
    TargetTemplate::Direct("Library/Caches/com.apple.Safari"),
    TargetTemplate::Direct("Library/Caches/Firefox/Profiles"),
    TargetTemplate::Direct("Library/Caches/Microsoft Edge"),
    TargetTemplate::Direct("Library/Caches/BraveSoftware/Brave-Browser"),
    TargetTemplate::Direct(".cache/google-chrome"),
    TargetTemplate::Direct(".cache/chromium"),
    TargetTemplate::Direct(".cache/mozilla/firefox"),
    TargetTemplate::Direct(".cache/BraveSoftware/Brave-Browser"),
];

/// Directory-sweep cleanups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanupKind {
    Caches,
    Logs,
    BrowserData,
}

impl CleanupKind {
    pub const ALL: [Self; 3] = [Self::Caches, Self::Logs, Self::BrowserData];

    pub fn templates(self) -> &'static [TargetTemplate] {
        match self {
            Self::Caches => CACHE_TARGETS,
            Self::Logs => LOG_TARGETS,
            Self::BrowserData => BROWSER_TARGETS,
        }
    }

    pub fn operation_kind(self) -> OperationKind {
        match self {
            Self::Caches => OperationKind::Caches,
            Self::Logs => OperationKind::Logs,
            Self::BrowserData => OperationKind::BrowserData,
        }
    }

    /// Every concrete directory this cleanup sweeps under `home`.
    pub fn targets(self, home: &Path) -> Vec<ResolvedTarget> {
        self.templates()
            .iter()
            .flat_map(|t| t.expand(home))
            .collect()
    }

    /// What [`run`](Self::run) would reclaim, grouped by target directory.
    pub fn plan(
        self,
        home: &Path,
        sweeper: &DirectoryReclaimer,
        policy: &SweepPolicy,
    ) -> Vec<(ResolvedTarget, Vec<Candidate>)> {
        self.targets(home)
            .into_iter()
            .filter_map(|target| {
                let candidates =
                    sweeper.plan_children(&target.directory, policy, target.identifier.as_deref());
                (!candidates.is_empty()).then_some((target, candidates))
            })
            .collect()
    }

    /// Sweep every target and merge the results.
    pub fn run(self, home: &Path, sweeper: &DirectoryReclaimer, policy: &SweepPolicy) -> OperationResult {
        let result: OperationResult = self
            .targets(home)
            .iter()
            .map(|t| sweeper.reclaim_children(&t.directory, policy, t.identifier.as_deref()))
            .sum();
        tracing::info!(
            kind = %self,
            removed = result.items_removed,
            failed = result.items_failed,
            bytes = result.bytes_freed,
            "Cleanup finished"
        );
        result
    }
}

impl fmt::Display for CleanupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Caches => write!(f, "caches"),
            Self::Logs => write!(f, "logs"),
            Self::BrowserData => write!(f, "browser"),
        }
    }
}

impl FromStr for CleanupKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "caches" | "cache" => Ok(Self::Caches),
            "logs" | "log" => Ok(Self::Logs),
            "browser" | "browser-data" => Ok(Self::BrowserData),
            other => Err(EngineError::invalid(format!("unknown cleanup kind '{other}'"))),
        }
    }
}

/// An application to remove along with its leftovers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    name: String,
    bundle_id: Option<String>,
}

fn check_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains('/') || value.contains('\\') {
        return Err(EngineError::invalid(format!(
            "{what} '{value}' is not a single path component"
        )));
    }
    Ok(())
}

impl AppTarget {
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if either value would escape
    /// the directory it is joined onto.
    pub fn new(name: impl Into<String>, bundle_id: Option<String>) -> Result<Self> {
        let name = name.into();
        let name = name.strip_suffix(".app").map(str::to_string).unwrap_or(name);
        check_component("application name", &name)?;
        if let Some(id) = &bundle_id {
            check_component("bundle id", id)?;
        }
        Ok(Self { name, bundle_id })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bundle_id(&self) -> Option<&str> {
        self.bundle_id.as_deref()
    }

    /// Candidate locations, existing or not.
    pub fn remnant_paths(&self, home: &Path) -> Vec<PathBuf> {
        let name = &self.name;
        let mut paths = vec![
            PathBuf::from("/Applications").join(format!("{name}.app")),
            home.join("Applications").join(format!("{name}.app")),
            home.join("Library/Application Support").join(name),
            home.join("Library/Caches").join(name),
            home.join("Library/Logs").join(name),
            home.join(".config").join(name),
            home.join(".cache").join(name),
            home.join(".local/share").join(name),
        ];
        if let Some(id) = &self.bundle_id {
            let lib = home.join("Library");
            paths.extend([
                lib.join("Application Support").join(id),
                lib.join("Caches").join(id),
                lib.join("Containers").join(id),
                lib.join("HTTPStorages").join(id),
                lib.join("Logs").join(id),
                lib.join("Preferences").join(format!("{id}.plist")),
                lib.join("Saved Application State").join(format!("{id}.savedState")),
                lib.join("WebKit").join(id),
            ]);
        }
        paths.sort();
        paths.dedup();
        paths
    }

    /// Remnants that exist and are not excluded, with their sizes.
    pub fn plan(&self, home: &Path, matcher: &PathMatcher) -> Vec<Candidate> {
        self.remnant_paths(home)
            .into_iter()
            .filter_map(|path| {
                let meta = fs::symlink_metadata(&path).ok()?;
                if matcher.should_exclude(&path, self.bundle_id()) {
                    tracing::debug!(path = %path.display(), "Remnant excluded by rule");
                    return None;
                }
                Some(Candidate {
                    size: size::estimate(&path, true),
                    modified: meta.modified().ok(),
                    path,
                })
            })
            .collect()
    }

    /// Move the application and its remnants into the holding area.
    ///
    /// Retention does not apply: removal was asked for explicitly.
    pub fn run(&self, home: &Path, reclaimer: &Reclaimer, matcher: &PathMatcher) -> OperationResult {
        let mut result = OperationResult::new();
        for candidate in self.plan(home, matcher) {
            reclaimer.reclaim_into(&candidate.path, candidate.size, &mut result);
        }
        tracing::info!(
            app = %self.name,
            removed = result.items_removed,
            failed = result.items_failed,
            bytes = result.bytes_freed,
            "Uninstall finished"
        );
        result
    }
}

impl fmt::Display for AppTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bundle_id {
            Some(id) => write!(f, "{} ({id})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Any removing operation the engine can plan and run over well-known locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Clean(CleanupKind),
    Uninstall(AppTarget),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Clean(kind) => kind.operation_kind(),
            Self::Uninstall(_) => OperationKind::Uninstall,
        }
    }

    /// Label attached to the emitted event.
    pub fn source(&self) -> Option<String> {
        match self {
            Self::Clean(_) => None,
            Self::Uninstall(app) => Some(app.to_string()),
        }
    }

    /// Flattened candidate list.
    pub fn plan(&self, home: &Path, sweeper: &DirectoryReclaimer, policy: &SweepPolicy) -> Vec<Candidate> {
        match self {
            Self::Clean(kind) => kind
                .plan(home, sweeper, policy)
                .into_iter()
                .flat_map(|(_, candidates)| candidates)
                .collect(),
            Self::Uninstall(app) => app.plan(home, &policy.matcher),
        }
    }

    pub fn run(&self, home: &Path, sweeper: &DirectoryReclaimer, policy: &SweepPolicy) -> OperationResult {
        match self {
            Self::Clean(kind) => kind.run(home, sweeper, policy),
            Self::Uninstall(app) => app.run(home, sweeper.reclaimer(), &policy.matcher),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean(kind) => write!(f, "clean {kind}"),
            Self::Uninstall(app) => write!(f, "uninstall {app}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trash::TrashDir;
    use assert_matches::assert_matches;
    use reclaim_schema::{ExclusionRule, ExclusionSet, RuleKind};
    use std::sync::Arc;

    fn sweeper(trash: &Path) -> DirectoryReclaimer {
        DirectoryReclaimer::new(Reclaimer::new(Arc::new(TrashDir::open(trash).unwrap())))
    }

    fn touch(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn per_container_expands_each_child() {
        let home = tempfile::tempdir().unwrap();
        fs::create_dir_all(home.path().join("Library/Containers/com.a/Data/Library/Caches")).unwrap();
        fs::create_dir_all(home.path().join("Library/Containers/com.b")).unwrap();
        touch(&home.path().join("Library/Containers/stray-file"), b"");

        let template = TargetTemplate::PerContainer {
            parent: "Library/Containers",
            subpath: "Data/Library/Caches",
        };
        let targets = template.expand(home.path());

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].identifier.as_deref(), Some("com.a"));
        assert_eq!(
            targets[1].directory,
            home.path().join("Library/Containers/com.b/Data/Library/Caches")
        );
    }

    #[test]
    fn missing_parent_expands_to_nothing() {
        let home = tempfile::tempdir().unwrap();
        let template = TargetTemplate::PerContainer {
            parent: "Library/Group Containers",
            subpath: "Library/Caches",
        };
        assert!(template.expand(home.path()).is_empty());
    }

    #[test]
    fn cache_clean_merges_targets_and_honours_container_identifier() {
        let home = tempfile::tempdir().unwrap();
        let h = home.path();
        touch(&h.join("Library/Caches/app1/blob"), b"one");
        touch(&h.join(".cache/tool/data"), b"two");
        touch(&h.join("Library/Containers/com.free/Data/Library/Caches/c"), b"three");
        touch(&h.join("Library/Containers/com.kept/Data/Library/Caches/c"), b"four");

        let rules: ExclusionSet =
            vec![ExclusionRule::new("kept", RuleKind::Identifier, "com.kept")].into();
        let policy = SweepPolicy::new(false, 0, PathMatcher::new(rules));
        let sweeper = sweeper(&h.join("trash"));

        let planned = Operation::Clean(CleanupKind::Caches).plan(h, &sweeper, &policy);
        assert_eq!(planned.len(), 3);

        let result = CleanupKind::Caches.run(h, &sweeper, &policy);

        assert_eq!(result.items_removed, 3);
        assert_eq!(result.items_failed, 0);
        assert!(!h.join("Library/Caches/app1").exists());
        assert!(!h.join(".cache/tool").exists());
        assert!(h.join("Library/Containers/com.kept/Data/Library/Caches/c").exists());
    }

    #[test]
    fn cleanup_kind_parses() {
        assert_eq!("browser".parse::<CleanupKind>().unwrap(), CleanupKind::BrowserData);
        assert_eq!("Logs".parse::<CleanupKind>().unwrap(), CleanupKind::Logs);
        assert_matches!("disk".parse::<CleanupKind>(), Err(EngineError::InvalidConfig(_)));
    }

    #[test]
    fn app_target_rejects_path_tricks() {
        assert_matches!(AppTarget::new("", None), Err(EngineError::InvalidConfig(_)));
        assert_matches!(AppTarget::new("../etc", None), Err(EngineError::InvalidConfig(_)));
        assert_matches!(
            AppTarget::new("Foo", Some("..".into())),
            Err(EngineError::InvalidConfig(_))
        );
        assert_eq!(AppTarget::new("Foo.app", None).unwrap().name(), "Foo");
    }

    #[test]
    fn uninstall_removes_existing_remnants_regardless_of_age() {
        let home = tempfile::tempdir().unwrap();
        let h = home.path();
        touch(&h.join("Applications/Foo.app/Contents/Info.plist"), b"plist");
        touch(&h.join("Library/Application Support/com.foo/state"), b"state");
        touch(&h.join("Library/Preferences/com.foo.plist"), b"prefs");
        touch(&h.join(".config/Foo/settings"), b"cfg");

        let app = AppTarget::new("Foo", Some("com.foo".into())).unwrap();
        // A seven-day window would protect all of these freshly written files.
        let policy = SweepPolicy::new(false, 7, PathMatcher::empty());
        let sweeper = sweeper(&h.join("trash"));

        let result = Operation::Uninstall(app).run(h, &sweeper, &policy);

        assert_eq!(result.items_removed, 4);
        assert!(!h.join("Applications/Foo.app").exists());
        assert!(!h.join("Library/Preferences/com.foo.plist").exists());
        assert!(!h.join(".config/Foo").exists());
    }
}
