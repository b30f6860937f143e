//! Batch input: parse the reference text format and run it.
//!
//! The format is a stream of whitespace-separated tokens; line breaks
//! carry no meaning:
//!
//! ```text
//! n m q                      node count, branching factor, query count
//! label_1 .. label_n         node labels in breadth-first order
//! opcode label owner  (x q)  1 = lock, 2 = unlock, 3 = upgrade
//! ```
//!
//! Example:
//!
//! ```text
//! 7 2 2
//! World Asia Africa China India SouthAfrica Egypt
//! 1 China 9
//! 3 Asia 9
//! ```

use crate::config::UnknownLabelPolicy;
use crate::error::{Result, TreeLockError};
use crate::events::{Event, Journal};
use crate::locking::{LockManager, OwnerId};
use crate::query::{Opcode, Outcome, Query};
use crate::tree::Tree;
use std::str::{FromStr, SplitWhitespace};
use tracing::{info, warn};

/// A parsed batch: tree description plus queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub branching_factor: usize,
    pub labels: Vec<String>,
    pub queries: Vec<Query>,
}

impl Batch {
    /// Parse a batch from its text form.
    ///
    /// Tokens after the last query are ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let mut tokens = Tokens::new(input);

        let node_count: usize = tokens.number("node count")?;
        let branching_factor: usize = tokens.number("branching factor")?;
        let query_count: usize = tokens.number("query count")?;

        let labels = (0..node_count)
            .map(|_| tokens.word("node label").map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        let queries = (0..query_count)
            .map(|_| tokens.query())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            branching_factor,
            labels,
            queries,
        })
    }

    /// Build the resource tree this batch describes.
    pub fn build_tree(&self) -> Result<Tree> {
        Tree::build(&self.labels, self.branching_factor)
    }
}

/// Cursor over input tokens that remembers its position for error reports.
struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
    position: usize,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_whitespace(),
            position: 0,
        }
    }

    fn word(&mut self, what: &str) -> Result<&'a str> {
        let token = self.inner.next().ok_or_else(|| {
            TreeLockError::parse(
                self.position,
                format!("expected {}, found end of input", what),
            )
        })?;
        self.position += 1;
        Ok(token)
    }

    fn number<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let index = self.position;
        let token = self.word(what)?;
        token.parse().map_err(|_| {
            TreeLockError::parse(index, format!("expected {}, found '{}'", what, token))
        })
    }

    fn query(&mut self) -> Result<Query> {
        let index = self.position;
        let code: u8 = self.number("opcode")?;
        let opcode = Opcode::from_code(code).ok_or_else(|| {
            TreeLockError::parse(index, format!("opcode must be 1, 2 or 3, found {}", code))
        })?;
        let label = self.word("query label")?.to_string();
        let owner = OwnerId(self.number("owner id")?);
        Ok(Query::new(opcode, label, owner))
    }
}

/// Settings for [`run_batch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub on_unknown_label: UnknownLabelPolicy,

    /// Check every counter after each query.
    pub audit: bool,
}

/// Apply `queries` in order and return one outcome per query.
///
/// With [`UnknownLabelPolicy::Abort`] the first unknown label stops the
/// run with [`TreeLockError::UnknownLabel`]; with `Skip` that query is
/// reported as not granted. When `journal` is given, every decision is
/// appended to it.
pub fn run_batch(
    manager: &mut LockManager,
    queries: &[Query],
    options: RunOptions,
    mut journal: Option<&mut Journal>,
) -> Result<Vec<Outcome>> {
    let mut outcomes = Vec::with_capacity(queries.len());

    for (seq, query) in queries.iter().enumerate() {
        let outcome = match manager.evaluate(query) {
            Ok(outcome) => {
                if let Some(journal) = journal.as_deref_mut() {
                    journal.append(&Event::decision(seq, &outcome)?)?;
                }
                outcome
            }
            Err(TreeLockError::UnknownLabel(label)) => {
                if let Some(journal) = journal.as_deref_mut() {
                    journal.append(&Event::unknown_label(seq, query))?;
                }
                match options.on_unknown_label {
                    UnknownLabelPolicy::Abort => return Err(TreeLockError::UnknownLabel(label)),
                    UnknownLabelPolicy::Skip => {
                        warn!(seq, %label, "skipping query for unknown label");
                        Outcome::skipped(query)
                    }
                }
            }
            Err(e) => return Err(e),
        };

        if options.audit {
            manager.audit().map_err(|violation| TreeLockError::Audit { seq, violation })?;
        }

        outcomes.push(outcome);
    }

    let granted = outcomes.iter().filter(|o| o.granted).count();
    info!(queries = outcomes.len(), granted, "batch complete");

    Ok(outcomes)
}
