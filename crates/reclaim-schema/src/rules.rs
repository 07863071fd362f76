//! Exclusion rules.
//!
//! Rules are loaded once per operation from the preference store and never
//! mutated while an operation runs. Matching lives in `reclaim-core`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque identifier of an exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    /// Wrap a raw identifier.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How a rule's value is compared against a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Full path equality.
    #[serde(alias = "exact")]
    ExactPath,
    /// The path starts with the value.
    #[serde(alias = "prefix")]
    PathPrefix,
    /// Equality against the candidate's secondary identifier (e.g. a bundle id).
    Identifier,
    /// `*` wildcard pattern over the full path.
    Glob,
}

/// A single immutable exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    /// Identity of the rule within its set.
    pub id: RuleId,
    /// Comparison applied to `value`.
    pub kind: RuleKind,
    /// Path, prefix, identifier or pattern, depending on `kind`.
    pub value: String,
}

impl ExclusionRule {
    /// Create a rule.
    pub fn new(id: impl Into<RuleId>, kind: RuleKind, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            value: value.into(),
        }
    }
}

impl From<String> for RuleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Mapping-backed set of rules keyed by id.
///
/// Inserting a rule with an id that is already present replaces the old rule.
/// Serialized as a plain list so configuration files stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ExclusionRule>", into = "Vec<ExclusionRule>")]
pub struct ExclusionSet {
    rules: BTreeMap<RuleId, ExclusionRule>,
}

impl ExclusionSet {
    /// An empty set: nothing is excluded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a rule, returning the rule previously stored under its id.
    pub fn insert(&mut self, rule: ExclusionRule) -> Option<ExclusionRule> {
        self.rules.insert(rule.id.clone(), rule)
    }

    /// Remove a rule by id.
    pub fn remove(&mut self, id: &RuleId) -> Option<ExclusionRule> {
        self.rules.remove(id)
    }

    /// Look up a rule by id.
    pub fn get(&self, id: &RuleId) -> Option<&ExclusionRule> {
        self.rules.get(id)
    }

    /// Iterate over rules in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ExclusionRule> {
        self.rules.values()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<ExclusionRule>> for ExclusionSet {
    fn from(rules: Vec<ExclusionRule>) -> Self {
        rules.into_iter().collect()
    }
}

impl From<ExclusionSet> for Vec<ExclusionRule> {
    fn from(set: ExclusionSet) -> Self {
        set.rules.into_values().collect()
    }
}

impl FromIterator<ExclusionRule> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = ExclusionRule>>(iter: I) -> Self {
        let mut set = Self::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_same_id() {
        let mut set = ExclusionSet::new();
        set.insert(ExclusionRule::new("a", RuleKind::ExactPath, "/one"));
        let old = set.insert(ExclusionRule::new("a", RuleKind::PathPrefix, "/two"));

        assert_eq!(old.map(|r| r.value), Some("/one".to_string()));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&"a".into()).unwrap().kind, RuleKind::PathPrefix);
    }

    #[test]
    fn collects_from_list() {
        let set: ExclusionSet = vec![
            ExclusionRule::new("b", RuleKind::Glob, "*.log"),
            ExclusionRule::new("a", RuleKind::Identifier, "com.example.app"),
        ]
        .into();

        let ids: Vec<_> = set.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
