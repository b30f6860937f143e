//! Lock queries and their outcomes.
//!
//! A query is one `(opcode, label, owner)` record. The numeric opcodes
//! used by batch input are 1 (lock), 2 (unlock) and 3 (upgrade).

use crate::error::{Result, TreeLockError};
use crate::locking::{Decision, OwnerId, Rejection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The operation a query requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    Lock,
    Unlock,
    Upgrade,
}

impl Opcode {
    /// Map a numeric batch opcode to an operation.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Lock),
            2 => Some(Self::Unlock),
            3 => Some(Self::Upgrade),
            _ => None,
        }
    }

    /// The numeric batch opcode of this operation.
    pub fn code(self) -> u8 {
        match self {
            Self::Lock => 1,
            Self::Unlock => 2,
            Self::Upgrade => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Upgrade => "upgrade",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested lock operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub opcode: Opcode,
    pub label: String,
    pub owner: OwnerId,
}

impl Query {
    pub fn new(opcode: Opcode, label: impl Into<String>, owner: OwnerId) -> Self {
        Self {
            opcode,
            label: label.into(),
            owner,
        }
    }

    pub fn lock(label: impl Into<String>, owner: OwnerId) -> Self {
        Self::new(Opcode::Lock, label, owner)
    }

    pub fn unlock(label: impl Into<String>, owner: OwnerId) -> Self {
        Self::new(Opcode::Unlock, label, owner)
    }

    pub fn upgrade(label: impl Into<String>, owner: OwnerId) -> Self {
        Self::new(Opcode::Upgrade, label, owner)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.opcode, self.label, self.owner)
    }
}

/// The result of applying one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub opcode: Opcode,
    pub label: String,
    pub owner: OwnerId,

    /// Whether the operation was applied.
    pub granted: bool,

    /// Why the operation was refused, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Rejection>,
}

impl Outcome {
    pub fn new(query: &Query, decision: Decision) -> Self {
        Self {
            opcode: query.opcode,
            label: query.label.clone(),
            owner: query.owner,
            granted: decision.is_ok(),
            reason: decision.err(),
        }
    }

    /// The outcome reported for a query whose label is not in the tree
    /// when the unknown-label policy is `skip`.
    pub fn skipped(query: &Query) -> Self {
        Self {
            opcode: query.opcode,
            label: query.label.clone(),
            owner: query.owner,
            granted: false,
            reason: None,
        }
    }

    /// Single-line JSON rendering.
    pub fn to_json_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TreeLockError::Io(format!("failed to serialize outcome: {}", e)))
    }
}
