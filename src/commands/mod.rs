//! Command implementations for treelock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the input loading both commands share.

mod run;
mod tree;

use crate::cli::{Command, SourceArgs};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use treelock::batch::Batch;
use treelock::config::Config;
use treelock::error::{Result, TreeLockError};
use treelock::locking::LockManager;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => run::cmd_run(args),
        Command::Tree(args) => tree::cmd_tree(args),
    }
}

/// Everything a command needs once input and config are loaded.
struct Loaded {
    config: Config,
    batch: Batch,
    manager: LockManager,
}

fn load(source: &SourceArgs) -> Result<Loaded> {
    let config = Config::load_or_default(source.config.as_deref())?;
    debug!(?config, "configuration loaded");

    let input = read_input(source.input.as_deref())?;
    let batch = Batch::parse(&input)?;
    let tree = batch.build_tree()?;
    info!(
        nodes = tree.len(),
        branching_factor = batch.branching_factor,
        queries = batch.queries.len(),
        "tree built"
    );

    Ok(Loaded {
        config,
        batch,
        manager: LockManager::new(Arc::new(tree)),
    })
}

/// Read the whole batch from `path`, or from stdin when absent or `-`.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path).map_err(|e| {
            TreeLockError::Io(format!(
                "failed to read input file '{}': {}",
                path.display(),
                e
            ))
        }),
        _ => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| TreeLockError::Io(format!("failed to read stdin: {}", e)))?;
            Ok(input)
        }
    }
}
