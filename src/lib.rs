//! treelock: a multi-granularity hierarchical lock manager.
//!
//! Resources form a fixed n-ary tree of unique labels. Any node may be
//! locked exclusively by one owner, but only while no ancestor and no
//! descendant of it is locked. An owner holding several locks under a node
//! can upgrade them into a single lock on that node.
//!
//! ```
//! use std::sync::Arc;
//! use treelock::{LockManager, OwnerId, Tree};
//!
//! let tree = Tree::build(
//!     &["World", "Asia", "Africa", "China", "India", "SouthAfrica", "Egypt"],
//!     2,
//! )?;
//! let mut locks = LockManager::new(Arc::new(tree));
//!
//! assert!(locks.lock("China", OwnerId(9))?);
//! assert!(locks.lock("India", OwnerId(9))?);
//! assert!(locks.upgrade("Asia", OwnerId(9))?);
//! assert!(!locks.unlock("India", OwnerId(9))?);
//! assert!(locks.unlock("Asia", OwnerId(9))?);
//! # Ok::<(), treelock::TreeLockError>(())
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod locking;
pub mod query;
pub mod tree;

pub use error::{Result, TreeLockError};
pub use locking::{LockManager, LockState, OwnerId, Rejection, SharedLockManager};
pub use query::{Opcode, Outcome, Query};
pub use tree::{NodeId, Tree};
