//! CLI argument parsing for treelock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use treelock::config::{OutputFormat, UnknownLabelPolicy};

/// treelock: hierarchical lock manager over a fixed tree of named resources.
///
/// A node can be locked by one owner at a time, and only while none of its
/// ancestors or descendants is locked. Input is the batch format: node
/// count, branching factor and query count, then the labels in
/// breadth-first order, then one `opcode label owner` triple per query
/// (1 = lock, 2 = unlock, 3 = upgrade).
#[derive(Parser, Debug)]
#[command(name = "treelock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for treelock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a batch and print one result per query.
    ///
    /// Results are printed in query order as `true`/`false` lines, or as
    /// JSON objects with `--format json`.
    Run(RunArgs),

    /// Print the resource tree with per-node lock state.
    ///
    /// With `--apply`, the batch queries are run first so the final lock
    /// state is shown.
    Tree(TreeArgs),
}

/// Where the batch comes from and which config applies.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Batch input file. Reads stdin when omitted or `-`.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// YAML config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format for results (overrides config).
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Append an NDJSON decision journal to this file (overrides config).
    #[arg(long)]
    pub journal: Option<PathBuf>,

    /// What to do when a query names a label missing from the tree (overrides config).
    #[arg(long, value_enum)]
    pub on_unknown_label: Option<UnknownLabelPolicy>,

    /// Verify every lock counter after each query.
    #[arg(long)]
    pub audit: bool,
}

/// Arguments for the `tree` command.
#[derive(Parser, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Apply the batch queries before printing.
    #[arg(long)]
    pub apply: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
