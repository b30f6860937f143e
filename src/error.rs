//! Error types for treelock.
//!
//! Lock policy rejections are not errors; they are reported as `false`
//! (see [`crate::locking::Rejection`]). This type covers data and usage
//! problems only: unknown labels, malformed input, bad config, I/O.

use crate::exit_codes;
use crate::locking::InvariantViolation;
use thiserror::Error;

/// Main error type for treelock operations.
#[derive(Error, Debug)]
pub enum TreeLockError {
    /// A label was looked up that does not exist in the tree.
    #[error("unknown resource label '{0}'")]
    UnknownLabel(String),

    /// A tree was requested from an empty label list.
    #[error("cannot build a tree from an empty label list")]
    EmptyTree,

    /// The branching factor cannot place every label.
    #[error("branching factor {factor} cannot place {labels} labels")]
    InvalidBranchingFactor { factor: usize, labels: usize },

    /// The same label was supplied for two nodes.
    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),

    /// The batch input is malformed.
    #[error("parse error at token {token_index}: {message}")]
    Parse { token_index: usize, message: String },

    /// Configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Lock counters disagree with the lock flags after a query.
    #[error("lock state audit failed after query {seq}: {violation}")]
    Audit {
        seq: usize,
        violation: InvariantViolation,
    },

    /// Reading input or writing output/journal failed.
    #[error("{0}")]
    Io(String),
}

impl TreeLockError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            TreeLockError::UnknownLabel(_) => exit_codes::UNKNOWN_LABEL,
            TreeLockError::EmptyTree
            | TreeLockError::InvalidBranchingFactor { .. }
            | TreeLockError::DuplicateLabel(_)
            | TreeLockError::Parse { .. } => exit_codes::INPUT_ERROR,
            TreeLockError::Config(_) | TreeLockError::Io(_) => exit_codes::USER_ERROR,
            TreeLockError::Audit { .. } => exit_codes::INTERNAL_ERROR,
        }
    }

    pub(crate) fn parse(token_index: usize, message: impl Into<String>) -> Self {
        TreeLockError::Parse {
            token_index,
            message: message.into(),
        }
    }
}

/// Result type alias for treelock operations.
pub type Result<T> = std::result::Result<T, TreeLockError>;
