//! `treelock tree`: print the hierarchy with per-node lock state.

use super::{Loaded, load};
use crate::cli::TreeArgs;
use std::io::{self, BufWriter, Write};
use treelock::batch::{RunOptions, run_batch};
use treelock::error::{Result, TreeLockError};
use treelock::locking::LockManager;

pub fn cmd_tree(args: TreeArgs) -> Result<()> {
    let Loaded {
        config,
        batch,
        mut manager,
    } = load(&args.source)?;

    if args.apply {
        let options = RunOptions {
            on_unknown_label: config.on_unknown_label,
            audit: config.audit,
        };
        run_batch(&mut manager, &batch.queries, options, None)?;
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_tree(&mut out, &manager)?;
    out.flush()
        .map_err(|e| TreeLockError::Io(format!("failed to write tree: {}", e)))
}

/// Write the tree in pre-order, indented two spaces per level.
///
/// Each line reads `label [anc=A desc=D]`, with ` locked by OWNER`
/// appended for locked nodes.
pub(crate) fn write_tree<W: Write>(out: &mut W, manager: &LockManager) -> Result<()> {
    let tree = manager.tree();
    let root = tree.root();

    for id in std::iter::once(root).chain(tree.descendants(root)) {
        let state = manager.state(id);
        let indent = "  ".repeat(tree.depth(id));
        let mut line = format!(
            "{}{} [anc={} desc={}]",
            indent,
            tree.label(id),
            state.ancestor_locked,
            state.descendant_locked
        );
        if let Some(owner) = state.owner {
            line.push_str(&format!(" locked by {}", owner));
        }
        writeln!(out, "{}", line)
            .map_err(|e| TreeLockError::Io(format!("failed to write tree: {}", e)))?;
    }

    Ok(())
}
