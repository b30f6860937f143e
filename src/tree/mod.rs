//! Tree Store: the immutable shape of the resource hierarchy.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to each other by
//! [`NodeId`]. A parent owns the ids of its children; a child keeps a
//! plain `Option<NodeId>` back-reference to its parent, so the structure
//! has no reference cycles and upward walks are a simple loop.
//!
//! Node ids are assigned in breadth-first order, which is also the order
//! labels are consumed during construction. The root is always id 0.
//!
//! The label index is built by a full traversal once construction is
//! complete and is never mutated afterwards. Lock state is not stored
//! here; see [`crate::locking`].

mod build;

use crate::error::{Result, TreeLockError};
use std::collections::HashMap;
use std::fmt;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of this node in breadth-first order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shape of a single resource node.
#[derive(Debug, Clone)]
struct Node {
    label: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
}

/// An immutable n-ary tree of uniquely labelled resources.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
}

impl Tree {
    /// Build a complete n-ary tree from labels in breadth-first order.
    ///
    /// The first label becomes the root; every placed node then takes the
    /// next `branching_factor` unconsumed labels as its children until the
    /// labels run out.
    ///
    /// # Errors
    ///
    /// * [`TreeLockError::EmptyTree`] if `labels` is empty
    /// * [`TreeLockError::InvalidBranchingFactor`] if `branching_factor` is 0
    ///   and more than one label was given
    /// * [`TreeLockError::DuplicateLabel`] if a label occurs twice
    pub fn build<S: AsRef<str>>(labels: &[S], branching_factor: usize) -> Result<Self> {
        let nodes = build::place_breadth_first(labels, branching_factor)?;
        let index = build::index_labels(&nodes)?;
        Ok(Self { nodes, index })
    }

    /// Resolve a label to its node in O(1).
    pub fn resolve(&self, label: &str) -> Result<NodeId> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| TreeLockError::UnknownLabel(label.to_string()))
    }

    /// Resolve a label, returning `None` if it is not in the tree.
    pub fn get(&self, label: &str) -> Option<NodeId> {
        self.index.get(label).copied()
    }

    /// Whether `label` names a node.
    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The label of `id`.
    pub fn label(&self, id: NodeId) -> &str {
        &self.nodes[id.0].label
    }

    /// The parent of `id`, or `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Direct children of `id`, in label order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Distance from the root (the root has depth 0).
    pub fn depth(&self, id: NodeId) -> usize {
        self.nodes[id.0].depth
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Strict descendants of `id` in depth-first pre-order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// All node ids in breadth-first (construction) order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeId> + ExactSizeIterator + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// All labels in breadth-first (construction) order.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(|node| node.label.as_str())
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }
}

/// Iterator over the parent chain of a node.
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Pre-order iterator over a subtree, driven by an explicit stack.
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(current).iter().rev().copied());
        Some(current)
    }
}
