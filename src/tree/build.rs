//! Breadth-first tree construction and label indexing.

use super::{Node, NodeId};
use crate::error::{Result, TreeLockError};
use std::collections::{HashMap, VecDeque};

/// Place labels into an arena, breadth first.
///
/// Because children are appended in the same order nodes are dequeued,
/// the arena position of each label equals its position in `labels`.
pub(super) fn place_breadth_first<S: AsRef<str>>(
    labels: &[S],
    branching_factor: usize,
) -> Result<Vec<Node>> {
    let Some(root_label) = labels.first() else {
        return Err(TreeLockError::EmptyTree);
    };

    if branching_factor == 0 && labels.len() > 1 {
        return Err(TreeLockError::InvalidBranchingFactor {
            factor: branching_factor,
            labels: labels.len(),
        });
    }

    let mut nodes = Vec::with_capacity(labels.len());
    nodes.push(Node {
        label: root_label.as_ref().to_string(),
        parent: None,
        children: Vec::new(),
        depth: 0,
    });

    let mut queue = VecDeque::from([NodeId(0)]);
    let mut next_label = 1;

    while let Some(current) = queue.pop_front() {
        if next_label >= labels.len() {
            break;
        }

        let end = next_label.saturating_add(branching_factor).min(labels.len());
        let depth = nodes[current.0].depth + 1;

        for label in &labels[next_label..end] {
            let child = NodeId(nodes.len());
            nodes.push(Node {
                label: label.as_ref().to_string(),
                parent: Some(current),
                children: Vec::new(),
                depth,
            });
            nodes[current.0].children.push(child);
            queue.push_back(child);
        }

        next_label = end;
    }

    Ok(nodes)
}

/// Build the label index by walking the finished tree from the root.
pub(super) fn index_labels(nodes: &[Node]) -> Result<HashMap<String, NodeId>> {
    let mut index = HashMap::with_capacity(nodes.len());
    let mut stack = vec![NodeId(0)];

    while let Some(id) = stack.pop() {
        let node = &nodes[id.0];
        if index.insert(node.label.clone(), id).is_some() {
            return Err(TreeLockError::DuplicateLabel(node.label.clone()));
        }
        stack.extend(node.children.iter().copied());
    }

    Ok(index)
}
