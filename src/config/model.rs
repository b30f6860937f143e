//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a treelock run.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Behaviour when a query references a label missing from the tree.
    pub on_unknown_label: UnknownLabelPolicy,

    /// Format of the per-query results on stdout.
    pub output_format: OutputFormat,

    /// Append an NDJSON record of every decision to this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<PathBuf>,

    /// Recompute all lock counters after every query and fail on mismatch.
    pub audit: bool,
}
