//! Exclusion rule evaluation.
//!
//! Rules are OR-ed: any match excludes. Adding a rule can only ever exclude
//! more paths, never fewer.

use std::path::Path;
use std::sync::Arc;

use reclaim_schema::{ExclusionRule, ExclusionSet, RuleKind};

/// Read-only view over a shared rule set.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    rules: Arc<ExclusionSet>,
}

impl PathMatcher {
    /// Wrap a rule set.
    pub fn new(rules: impl Into<Arc<ExclusionSet>>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// A matcher with no rules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The underlying rules.
    pub fn rules(&self) -> &ExclusionSet {
        &self.rules
    }

    /// True when any rule matches `path` or `identifier`.
    pub fn should_exclude(&self, path: &Path, identifier: Option<&str>) -> bool {
        self.matching_rule(path, identifier).is_some()
    }

    /// First rule (in id order) that matches.
    pub fn matching_rule(&self, path: &Path, identifier: Option<&str>) -> Option<&ExclusionRule> {
        if self.rules.is_empty() {
            return None;
        }
        let text = path.to_string_lossy();
        self.rules
            .iter()
            .find(|rule| rule_matches(rule, &text, identifier))
    }
}

/// Evaluate a single rule.
pub fn rule_matches(rule: &ExclusionRule, path: &str, identifier: Option<&str>) -> bool {
    match rule.kind {
        RuleKind::ExactPath => path == rule.value,
        RuleKind::PathPrefix => path.starts_with(rule.value.as_str()),
        RuleKind::Identifier => identifier.is_some_and(|id| id == rule.value),
        RuleKind::Glob => glob_match(&rule.value, path),
    }
}

/// `*`-only wildcard match.
///
/// The pattern is split on `*`. The first segment anchors the start, inner
/// segments are found left to right, and unless the pattern ends in `*` the
/// last segment must end the text. No escaping, no character classes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    let [first, middle @ .., last] = segments.as_slice() else {
        // No `*`: split yields the whole pattern once.
        return pattern == text;
    };

    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    for segment in middle {
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }

    // An empty last segment means the pattern ended in `*`.
    rest.len() >= last.len() && rest.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reclaim_schema::ExclusionRule;
    use std::path::PathBuf;

    fn matcher(rules: Vec<ExclusionRule>) -> PathMatcher {
        PathMatcher::new(ExclusionSet::from(rules))
    }

    #[test]
    fn glob_caches_segment() {
        assert!(glob_match("*/Caches/*", "/a/b/Caches/c"));
        assert!(!glob_match("*/Caches/*", "/a/b/CachesX/c"));
    }

    #[test]
    fn glob_without_star_is_exact() {
        assert!(glob_match("/a/b", "/a/b"));
        assert!(!glob_match("/a/b", "/a/b/c"));
        assert!(!glob_match("/a/b", "/a"));
    }

    #[test]
    fn glob_anchors_both_ends() {
        assert!(glob_match("/Users/*.log", "/Users/me/app.log"));
        assert!(!glob_match("/Users/*.log", "/tmp/Users/me/app.log"));
        assert!(!glob_match("/Users/*.log", "/Users/me/app.log.1"));
        assert!(glob_match("*.log", ".log"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*a", "aa"));
        assert!(!glob_match("ab*ba", "aba"));
    }

    #[test]
    fn glob_last_segment_may_repeat_earlier() {
        assert!(glob_match("*x", "x_x"));
        assert!(glob_match("a*b*c", "a_c_b_c"));
    }

    #[test]
    fn exact_and_prefix() {
        let m = matcher(vec![
            ExclusionRule::new("e", RuleKind::ExactPath, "/keep/me"),
            ExclusionRule::new("p", RuleKind::PathPrefix, "/vault"),
        ]);
        assert!(m.should_exclude(Path::new("/keep/me"), None));
        assert!(!m.should_exclude(Path::new("/keep/me/too"), None));
        assert!(m.should_exclude(Path::new("/vault/x"), None));
        assert!(m.should_exclude(Path::new("/vaulted"), None));
        assert!(!m.should_exclude(Path::new("/other"), None));
    }

    #[test]
    fn identifier_needs_an_identifier() {
        let m = matcher(vec![ExclusionRule::new(
            "id",
            RuleKind::Identifier,
            "com.example.app",
        )]);
        assert!(m.should_exclude(Path::new("/anything"), Some("com.example.app")));
        assert!(!m.should_exclude(Path::new("/anything"), Some("com.other")));
        assert!(!m.should_exclude(Path::new("com.example.app"), None));
    }

    #[test]
    fn prefix_rule_excludes_exactly_its_prefix() {
        let paths: Vec<PathBuf> = ["/a/b", "/a/bc/d", "/a/x", "/b/a/b", "/a"]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let m = matcher(vec![ExclusionRule::new("p", RuleKind::PathPrefix, "/a/b")]);
        for p in &paths {
            assert_eq!(
                m.should_exclude(p, None),
                p.to_string_lossy().starts_with("/a/b"),
                "{}",
                p.display()
            );
        }
    }

    #[test]
    fn adding_rules_is_monotonic() {
        let paths: Vec<PathBuf> = ["/a/b/Caches/c", "/x/y.log", "/keep", "/vault/z"]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let candidates = [
            ExclusionRule::new("1", RuleKind::Glob, "*.log"),
            ExclusionRule::new("2", RuleKind::PathPrefix, "/vault"),
            ExclusionRule::new("3", RuleKind::ExactPath, "/keep"),
            ExclusionRule::new("4", RuleKind::Glob, "*/Caches/*"),
        ];

        let mut set = ExclusionSet::new();
        let mut previous: Vec<bool> = vec![false; paths.len()];
        for rule in candidates {
            set.insert(rule);
            let m = PathMatcher::new(set.clone());
            let now: Vec<bool> = paths.iter().map(|p| m.should_exclude(p, None)).collect();
            for (before, after) in previous.iter().zip(&now) {
                assert!(!before || *after);
            }
            previous = now;
        }
        assert!(previous.iter().all(|x| *x));
    }
}
