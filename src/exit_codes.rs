//! Exit code constants for the treelock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable files, invalid config)
//! - 2: Input error (malformed batch input, unbuildable tree)
//! - 3: A query referenced a label that is not in the tree
//! - 4: Lock state failed its consistency audit

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, I/O failure, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Input error: the batch input could not be parsed or the tree could not be built.
pub const INPUT_ERROR: i32 = 2;

/// A query referenced an unknown label and the unknown-label policy is `abort`.
pub const UNKNOWN_LABEL: i32 = 3;

/// Lock counters disagreed with lock flags during an `--audit` run.
pub const INTERNAL_ERROR: i32 = 4;
