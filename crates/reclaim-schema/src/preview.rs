//! Staged deletion plan.
//!
//! The presentation layer builds and edits a [`PreviewTree`]; the engine only
//! reads back [`PreviewTree::selected_leaf_paths`] when executing the plan.
//! Nodes live in an arena and own their children by index, so there are no
//! back-pointers and no shared mutable references.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised when addressing a node that is not in the tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    /// The id does not belong to this tree.
    #[error("Unknown preview node: {0}")]
    UnknownNode(usize),
}

/// Index of a node within its [`PreviewTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One row of the plan: a group heading or a concrete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewNode {
    /// Short label.
    pub title: String,
    /// Optional secondary text.
    pub detail: Option<String>,
    /// Path acted upon when this node is a selected leaf.
    pub path: Option<PathBuf>,
    /// Bytes attributed to this node alone, excluding children.
    pub own_size: u64,
    /// Whether the node is part of the plan.
    pub selected: bool,
    children: Vec<NodeId>,
}

impl PreviewNode {
    /// A heading node with no path of its own. Starts selected.
    pub fn group(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: None,
            path: None,
            own_size: 0,
            selected: true,
            children: Vec::new(),
        }
    }

    /// A node standing for a concrete path. Starts selected.
    pub fn item(title: impl Into<String>, path: impl Into<PathBuf>, own_size: u64) -> Self {
        Self {
            path: Some(path.into()),
            own_size,
            ..Self::group(title)
        }
    }

    /// Attach secondary text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Child ids in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// True when the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed forest of [`PreviewNode`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTree {
    nodes: Vec<PreviewNode>,
    roots: Vec<NodeId>,
}

impl PreviewTree {
    /// An empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node.
    pub fn add_root(&mut self, node: PreviewNode) -> NodeId {
        let id = self.push(node);
        self.roots.push(id);
        id
    }

    /// Add `node` under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::UnknownNode`] if `parent` is not in this tree.
    pub fn add_child(&mut self, parent: NodeId, node: PreviewNode) -> Result<NodeId, PreviewError> {
        self.check(parent)?;
        let id = self.push(node);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Top-level node ids.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Borrow a node.
    pub fn get(&self, id: NodeId) -> Option<&PreviewNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flip a node's selection and apply the new state to all descendants.
    ///
    /// Returns the node's new selection state.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::UnknownNode`] if `id` is not in this tree.
    pub fn toggle(&mut self, id: NodeId) -> Result<bool, PreviewError> {
        self.check(id)?;
        let selected = !self.nodes[id.0].selected;
        self.cascade(id, selected);
        Ok(selected)
    }

    /// Set a node's selection and apply it to all descendants.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::UnknownNode`] if `id` is not in this tree.
    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> Result<(), PreviewError> {
        self.check(id)?;
        self.cascade(id, selected);
        Ok(())
    }

    /// Own size plus the total size of every descendant.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::UnknownNode`] if `id` is not in this tree.
    pub fn total_size(&self, id: NodeId) -> Result<u64, PreviewError> {
        self.check(id)?;
        let mut total = 0u64;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = &self.nodes[next.0];
            total = total.saturating_add(node.own_size);
            stack.extend_from_slice(&node.children);
        }
        Ok(total)
    }

    /// Find the first node whose path equals `path`.
    pub fn find_path(&self, path: &Path) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.path.as_deref() == Some(path))
            .map(NodeId)
    }

    /// Paths of selected leaves, depth-first in insertion order.
    pub fn selected_leaf_paths(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.is_leaf() {
                if node.selected {
                    if let Some(path) = &node.path {
                        out.push(path.clone());
                    }
                }
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn push(&mut self, node: PreviewNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn check(&self, id: NodeId) -> Result<(), PreviewError> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(PreviewError::UnknownNode(id.0))
        }
    }

    fn cascade(&mut self, id: NodeId, selected: bool) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = &mut self.nodes[next.0];
            node.selected = selected;
            stack.extend_from_slice(&node.children);
        }
    }
}
