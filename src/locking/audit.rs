//! Full recomputation of lock counters, for checking the incremental ones.

use super::LockManager;
use thiserror::Error;

/// A lock-state invariant that does not hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("node '{label}' records {recorded} locked ancestors but has {actual}")]
    AncestorCount {
        label: String,
        recorded: u32,
        actual: u32,
    },

    #[error("node '{label}' records {recorded} locked descendants but has {actual}")]
    DescendantCount {
        label: String,
        recorded: u32,
        actual: u32,
    },

    #[error("nodes '{ancestor}' and '{descendant}' are both locked")]
    NestedLocks { ancestor: String, descendant: String },
}

impl LockManager {
    /// Recompute every counter from the lock flags and compare.
    ///
    /// Node ids are breadth-first, so every parent precedes its children:
    /// one forward pass yields ancestor counts and one backward pass yields
    /// descendant counts.
    pub fn audit(&self) -> Result<(), InvariantViolation> {
        let tree = self.tree();
        let len = tree.len();
        let locked = |index: usize| u32::from(self.states[index].is_locked());

        let mut ancestors = vec![0u32; len];
        for id in tree.iter() {
            if let Some(parent) = tree.parent(id) {
                ancestors[id.index()] = ancestors[parent.index()] + locked(parent.index());
            }
        }

        let mut descendants = vec![0u32; len];
        for id in tree.iter().rev() {
            if let Some(parent) = tree.parent(id) {
                descendants[parent.index()] += descendants[id.index()] + locked(id.index());
            }
        }

        for id in tree.iter() {
            let state = &self.states[id.index()];
            let label = tree.label(id);

            if state.ancestor_locked != ancestors[id.index()] {
                return Err(InvariantViolation::AncestorCount {
                    label: label.to_string(),
                    recorded: state.ancestor_locked,
                    actual: ancestors[id.index()],
                });
            }
            if state.descendant_locked != descendants[id.index()] {
                return Err(InvariantViolation::DescendantCount {
                    label: label.to_string(),
                    recorded: state.descendant_locked,
                    actual: descendants[id.index()],
                });
            }

            if state.is_locked()
                && let Some(holder) = tree.ancestors(id).find(|a| self.states[a.index()].is_locked())
            {
                return Err(InvariantViolation::NestedLocks {
                    ancestor: tree.label(holder).to_string(),
                    descendant: label.to_string(),
                });
            }
        }

        Ok(())
    }
}
