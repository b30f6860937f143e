//! Thread-shareable wrapper around [`LockManager`].
//!
//! Every operation holds one mutex for its full duration, so the two
//! phases of an upgrade never interleave with another mutation. The tree
//! itself needs no guard: it is immutable and already behind an `Arc`.

use super::{InvariantViolation, LockManager, LockState, OwnerId};
use crate::error::Result;
use crate::query::{Outcome, Query};
use crate::tree::{NodeId, Tree};
use std::sync::{Arc, Mutex, MutexGuard};

/// A [`LockManager`] behind a single mutual-exclusion boundary.
#[derive(Debug)]
pub struct SharedLockManager {
    tree: Arc<Tree>,
    inner: Mutex<LockManager>,
}

impl SharedLockManager {
    pub fn new(manager: LockManager) -> Self {
        Self {
            tree: manager.shared_tree(),
            inner: Mutex::new(manager),
        }
    }

    /// Create a manager over `tree` with every node unlocked.
    pub fn for_tree(tree: Arc<Tree>) -> Self {
        Self::new(LockManager::new(tree))
    }

    /// The tree, readable without taking the lock.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn lock(&self, label: &str, owner: OwnerId) -> Result<bool> {
        self.guard().lock(label, owner)
    }

    pub fn unlock(&self, label: &str, owner: OwnerId) -> Result<bool> {
        self.guard().unlock(label, owner)
    }

    pub fn upgrade(&self, label: &str, owner: OwnerId) -> Result<bool> {
        self.guard().upgrade(label, owner)
    }

    pub fn apply(&self, query: &Query) -> Result<bool> {
        self.guard().apply(query)
    }

    pub fn evaluate(&self, query: &Query) -> Result<Outcome> {
        self.guard().evaluate(query)
    }

    /// Copy of one node's lock state.
    pub fn state(&self, id: NodeId) -> LockState {
        self.guard().state(id).clone()
    }

    pub fn audit(&self) -> std::result::Result<(), InvariantViolation> {
        self.guard().audit()
    }

    /// Run several steps under one acquisition of the mutex.
    pub fn with<R>(&self, f: impl FnOnce(&mut LockManager) -> R) -> R {
        f(&mut *self.guard())
    }

    pub fn into_inner(self) -> LockManager {
        self.inner
            .into_inner()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn guard(&self) -> MutexGuard<'_, LockManager> {
        // Mutations never panic midway, so a poisoned manager is still consistent.
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl From<LockManager> for SharedLockManager {
    fn from(manager: LockManager) -> Self {
        Self::new(manager)
    }
}
