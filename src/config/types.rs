//! Configuration enums shared by the config file and the CLI.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What a batch run does when a query names a label that is not in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLabelPolicy {
    /// Stop the run and report the unknown label (default).
    #[default]
    Abort,
    /// Report `false` for that query, log a warning, and continue.
    Skip,
}

/// How query results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One `true`/`false` line per query (default).
    #[default]
    Text,
    /// One JSON object per query with the rejection reason.
    Json,
}
