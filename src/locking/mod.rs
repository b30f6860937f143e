//! Lock Manager: exclusive, hierarchy-aware locks over a [`Tree`].
//!
//! Each node carries a lock flag with its owner plus two denormalized
//! counters:
//! - `ancestor_locked`: how many strict ancestors are currently locked
//! - `descendant_locked`: how many strict descendants are currently locked
//!
//! A node may be locked only when it is unlocked and both counters are
//! zero. Locking or unlocking a node walks its parent chain and its full
//! subtree to keep every counter equal to the true count, so all
//! precondition checks are O(1).
//!
//! # Operations
//!
//! - **lock**: take an unlocked node with no locked ancestor or descendant
//! - **unlock**: release a node, only by its owner
//! - **upgrade**: replace every locked descendant (all held by the same
//!   owner) with one lock on the node itself
//!
//! Every operation is all-or-nothing. A rejected operation returns a
//! [`Rejection`] (or `false` in the boolean API) and leaves state
//! untouched. Upgrade runs in two phases: a read-only scan that collects
//! and validates the locked descendants, then a commit that cannot fail.
//!
//! `LockManager` is a single-caller state machine. Use
//! [`SharedLockManager`] to share one across threads.

mod audit;
pub mod shared;
#[cfg(test)]
mod tests;

pub use audit::InvariantViolation;
pub use shared::SharedLockManager;

use crate::error::Result;
use crate::query::{Opcode, Outcome, Query};
use crate::tree::{NodeId, Tree};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Identifier of a lock holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OwnerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Mutable lock state of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockState {
    /// Holder of the lock; `None` when the node is unlocked.
    pub owner: Option<OwnerId>,

    /// Number of locked strict ancestors.
    pub ancestor_locked: u32,

    /// Number of locked strict descendants.
    pub descendant_locked: u32,
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        self.owner.is_some()
    }
}

/// Why a lock operation was refused.
///
/// Rejections are expected policy outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The node is already locked.
    AlreadyLocked,
    /// Some strict ancestor is locked.
    AncestorLocked,
    /// Some strict descendant is locked.
    DescendantLocked,
    /// Unlock was requested on a node that is not locked.
    NotLocked,
    /// Unlock was requested by someone other than the holder.
    OwnerMismatch,
    /// Upgrade was requested but no descendant is locked.
    NoLockedDescendants,
    /// Upgrade found a locked descendant held by a different owner.
    ForeignDescendant,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::AlreadyLocked => "already_locked",
            Rejection::AncestorLocked => "ancestor_locked",
            Rejection::DescendantLocked => "descendant_locked",
            Rejection::NotLocked => "not_locked",
            Rejection::OwnerMismatch => "owner_mismatch",
            Rejection::NoLockedDescendants => "no_locked_descendants",
            Rejection::ForeignDescendant => "foreign_descendant",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single lock decision.
pub type Decision = std::result::Result<(), Rejection>;

/// Lock state for every node of a shared, immutable tree.
#[derive(Debug, Clone)]
pub struct LockManager {
    tree: Arc<Tree>,
    states: Vec<LockState>,
}

impl LockManager {
    /// Create a manager with every node unlocked.
    pub fn new(tree: Arc<Tree>) -> Self {
        let states = vec![LockState::default(); tree.len()];
        Self { tree, states }
    }

    /// The tree whose nodes this manager locks.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Another handle to the underlying tree.
    pub fn shared_tree(&self) -> Arc<Tree> {
        Arc::clone(&self.tree)
    }

    /// Owner and counters of `id`.
    pub fn state(&self, id: NodeId) -> &LockState {
        &self.states[id.index()]
    }

    /// Whether `id` itself holds a lock.
    pub fn is_locked(&self, id: NodeId) -> bool {
        self.state(id).is_locked()
    }

    /// Holder of the lock on `id`, if any.
    pub fn owner(&self, id: NodeId) -> Option<OwnerId> {
        self.state(id).owner
    }

    /// Currently locked nodes with their holders, in breadth-first order.
    pub fn locked_nodes(&self) -> impl Iterator<Item = (NodeId, OwnerId)> + '_ {
        self.tree
            .iter()
            .filter_map(|id| self.owner(id).map(|owner| (id, owner)))
    }

    /// Release every lock.
    pub fn reset(&mut self) {
        self.states.fill(LockState::default());
    }

    // ========================================================================
    // Label-level API
    // ========================================================================

    /// Lock `label` for `owner`.
    ///
    /// Returns `Ok(false)` when the lock is refused and
    /// `Err(UnknownLabel)` when the label is not in the tree.
    pub fn lock(&mut self, label: &str, owner: OwnerId) -> Result<bool> {
        let id = self.tree.resolve(label)?;
        Ok(self.lock_node(id, owner))
    }

    /// Unlock `label`, which must be held by `owner`.
    pub fn unlock(&mut self, label: &str, owner: OwnerId) -> Result<bool> {
        let id = self.tree.resolve(label)?;
        Ok(self.unlock_node(id, owner))
    }

    /// Upgrade `owner`'s descendant locks under `label` into one lock on `label`.
    pub fn upgrade(&mut self, label: &str, owner: OwnerId) -> Result<bool> {
        let id = self.tree.resolve(label)?;
        Ok(self.upgrade_node(id, owner))
    }

    /// Apply a query and report whether it was granted.
    pub fn apply(&mut self, query: &Query) -> Result<bool> {
        self.evaluate(query).map(|outcome| outcome.granted)
    }

    /// Apply a query and report the full outcome, including any rejection.
    pub fn evaluate(&mut self, query: &Query) -> Result<Outcome> {
        let id = self.tree.resolve(&query.label)?;
        let decision = match query.opcode {
            Opcode::Lock => self.try_lock(id, query.owner),
            Opcode::Unlock => self.try_unlock(id, query.owner),
            Opcode::Upgrade => self.try_upgrade(id, query.owner),
        };
        Ok(Outcome::new(query, decision))
    }

    // ========================================================================
    // Node-level API
    // ========================================================================

    /// Lock `id` for `owner`; `false` when refused.
    pub fn lock_node(&mut self, id: NodeId, owner: OwnerId) -> bool {
        self.try_lock(id, owner).is_ok()
    }

    /// Unlock `id` if `owner` holds it.
    pub fn unlock_node(&mut self, id: NodeId, owner: OwnerId) -> bool {
        self.try_unlock(id, owner).is_ok()
    }

    /// Upgrade `owner`'s locks under `id` into one lock on `id`.
    pub fn upgrade_node(&mut self, id: NodeId, owner: OwnerId) -> bool {
        self.try_upgrade(id, owner).is_ok()
    }

    /// Lock `id` for `owner`, or explain why not.
    pub fn try_lock(&mut self, id: NodeId, owner: OwnerId) -> Decision {
        let decision = self.check_lockable(id).map(|()| self.commit_lock(id, owner));
        self.trace_decision(Opcode::Lock, id, owner, decision);
        decision
    }

    /// Unlock `id` on behalf of `owner`, or explain why not.
    pub fn try_unlock(&mut self, id: NodeId, owner: OwnerId) -> Decision {
        let decision = match self.owner(id) {
            None => Err(Rejection::NotLocked),
            Some(holder) if holder != owner => Err(Rejection::OwnerMismatch),
            Some(_) => {
                self.commit_unlock(id);
                Ok(())
            }
        };
        self.trace_decision(Opcode::Unlock, id, owner, decision);
        decision
    }

    /// Upgrade `owner`'s locks below `id` into a single lock on `id`.
    pub fn try_upgrade(&mut self, id: NodeId, owner: OwnerId) -> Decision {
        let decision = self
            .collect_upgrade_set(id, owner)
            .map(|consumed| self.commit_upgrade(id, owner, &consumed));
        self.trace_decision(Opcode::Upgrade, id, owner, decision);
        decision
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn check_lockable(&self, id: NodeId) -> Decision {
        let state = self.state(id);
        if state.is_locked() {
            return Err(Rejection::AlreadyLocked);
        }
        if state.ancestor_locked != 0 {
            return Err(Rejection::AncestorLocked);
        }
        if state.descendant_locked != 0 {
            return Err(Rejection::DescendantLocked);
        }
        Ok(())
    }

    /// Phase one of upgrade: read-only validation.
    ///
    /// Returns every locked descendant of `id`, or the first reason the
    /// upgrade cannot proceed. Subtrees whose root has no locked
    /// descendants are not entered.
    fn collect_upgrade_set(
        &self,
        id: NodeId,
        owner: OwnerId,
    ) -> std::result::Result<Vec<NodeId>, Rejection> {
        let state = self.state(id);
        if state.is_locked() {
            return Err(Rejection::AlreadyLocked);
        }
        if state.ancestor_locked != 0 {
            return Err(Rejection::AncestorLocked);
        }
        if state.descendant_locked == 0 {
            return Err(Rejection::NoLockedDescendants);
        }

        let mut consumed = Vec::with_capacity(state.descendant_locked as usize);
        let mut stack: Vec<NodeId> = self.tree.children(id).iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            let state = self.state(current);
            if let Some(holder) = state.owner {
                if holder != owner {
                    return Err(Rejection::ForeignDescendant);
                }
                consumed.push(current);
            }
            if state.descendant_locked != 0 {
                stack.extend(self.tree.children(current).iter().rev().copied());
            }
        }

        Ok(consumed)
    }

    /// Phase two of upgrade: release the collected locks, then take `id`.
    fn commit_upgrade(&mut self, id: NodeId, owner: OwnerId, consumed: &[NodeId]) {
        for &node in consumed {
            self.commit_unlock(node);
        }
        debug!(
            label = self.tree.label(id),
            consumed = consumed.len(),
            "upgrade released descendant locks"
        );
        self.commit_lock(id, owner);
    }

    fn commit_lock(&mut self, id: NodeId, owner: OwnerId) {
        for ancestor in self.tree.ancestors(id) {
            self.states[ancestor.index()].descendant_locked += 1;
        }
        for descendant in self.tree.descendants(id) {
            self.states[descendant.index()].ancestor_locked += 1;
        }
        self.states[id.index()].owner = Some(owner);
    }

    fn commit_unlock(&mut self, id: NodeId) {
        for ancestor in self.tree.ancestors(id) {
            self.states[ancestor.index()].descendant_locked -= 1;
        }
        for descendant in self.tree.descendants(id) {
            self.states[descendant.index()].ancestor_locked -= 1;
        }
        self.states[id.index()].owner = None;
    }

    fn trace_decision(&self, opcode: Opcode, id: NodeId, owner: OwnerId, decision: Decision) {
        let label = self.tree.label(id);
        match decision {
            Ok(()) => debug!(%opcode, label, %owner, "granted"),
            Err(rejection) => debug!(%opcode, label, %owner, %rejection, "rejected"),
        }
    }
}
