//! Decision journal for treelock.
//!
//! An optional append-only audit log of a batch run. Events are stored in
//! NDJSON format (one JSON object per line) at the path given by the
//! `journal` config key or the `--journal` flag.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: `run_start`, `decision`, `unknown_label` or `run_end`
//! - `actor`: who ran the batch (`user@HOST`)
//! - `seq`: zero-based query position, for per-query events
//! - `details`: action-specific object (for `decision`, the query outcome)
//!
//! # Usage
//!
//! ```no_run
//! use treelock::events::{Event, EventAction, Journal};
//! use serde_json::json;
//!
//! let mut journal = Journal::open("decisions.ndjson")?;
//! journal.append(&Event::new(EventAction::RunStart).with_details(json!({"nodes": 7})))?;
//! journal.finish()?;
//! # Ok::<(), treelock::error::TreeLockError>(())
//! ```

use crate::error::{Result, TreeLockError};
use crate::query::{Outcome, Query};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A batch run began.
    RunStart,
    /// A query was granted or rejected.
    Decision,
    /// A query named a label that is not in the tree.
    UnknownLabel,
    /// A batch run completed.
    RunEnd,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::RunStart => write!(f, "run_start"),
            EventAction::Decision => write!(f, "decision"),
            EventAction::UnknownLabel => write!(f, "unknown_label"),
            EventAction::RunEnd => write!(f, "run_end"),
        }
    }
}

/// A record in the decision journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// What happened.
    pub action: EventAction,

    /// The user and host that ran the batch (e.g., `user@HOST`).
    pub actor: String,

    /// Position of the query in the batch, for per-query events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<usize>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event stamped with the current time and actor.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            seq: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// A `decision` event for the query at position `seq`.
    pub fn decision(seq: usize, outcome: &Outcome) -> Result<Self> {
        let details = serde_json::to_value(outcome).map_err(|e| {
            TreeLockError::Io(format!("failed to serialize outcome to JSON: {}", e))
        })?;
        Ok(Self::new(EventAction::Decision)
            .with_seq(seq)
            .with_details(details))
    }

    /// An `unknown_label` event for the query at position `seq`.
    pub fn unknown_label(seq: usize, query: &Query) -> Self {
        Self::new(EventAction::UnknownLabel)
            .with_seq(seq)
            .with_details(json!({
                "opcode": query.opcode,
                "label": query.label,
                "owner": query.owner,
            }))
    }

    /// Set the query position for this event.
    pub fn with_seq(mut self, seq: usize) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TreeLockError::Io(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// An open journal file, appended to one line per event.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Journal {
    /// Open `path` for appending, creating it and its parent directory if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                TreeLockError::Io(format!(
                    "failed to create journal directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                TreeLockError::Io(format!(
                    "failed to open journal '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single JSON line.
    pub fn append(&mut self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;
        writeln!(self.writer, "{}", json_line).map_err(|e| {
            TreeLockError::Io(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Flush buffered events and sync the file to disk.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().map_err(|e| {
            TreeLockError::Io(format!(
                "failed to flush journal '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        self.writer.get_ref().sync_all().map_err(|e| {
            TreeLockError::Io(format!(
                "failed to sync journal '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

/// Read every event from a journal file.
pub fn read_journal<P: AsRef<Path>>(path: P) -> Result<Vec<Event>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        TreeLockError::Io(format!(
            "failed to read journal '{}': {}",
            path.display(),
            e
        ))
    })?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                TreeLockError::Io(format!(
                    "failed to parse journal '{}' line {}: {}",
                    path.display(),
                    n + 1,
                    e
                ))
            })
        })
        .collect()
}
