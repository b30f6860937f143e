//! `treelock run`: apply a batch and print one result per query.

use super::{Loaded, load};
use crate::cli::RunArgs;
use serde_json::json;
use std::io::{self, BufWriter, Write};
use treelock::batch::{RunOptions, run_batch};
use treelock::config::OutputFormat;
use treelock::error::{Result, TreeLockError};
use treelock::events::{Event, EventAction, Journal};
use treelock::query::Outcome;

pub fn cmd_run(args: RunArgs) -> Result<()> {
    let Loaded {
        config,
        batch,
        mut manager,
    } = load(&args.source)?;

    let config = config.with_overrides(args.on_unknown_label, args.format, args.journal, args.audit)?;
    let options = RunOptions {
        on_unknown_label: config.on_unknown_label,
        audit: config.audit,
    };

    let mut journal = config.journal.as_deref().map(Journal::open).transpose()?;
    if let Some(journal) = journal.as_mut() {
        journal.append(&Event::new(EventAction::RunStart).with_details(json!({
            "nodes": manager.tree().len(),
            "branching_factor": batch.branching_factor,
            "queries": batch.queries.len(),
        })))?;
    }

    let result = run_batch(&mut manager, &batch.queries, options, journal.as_mut());

    if let Some(mut journal) = journal {
        let details = match &result {
            Ok(outcomes) => json!({
                "completed": outcomes.len(),
                "granted": outcomes.iter().filter(|o| o.granted).count(),
            }),
            Err(e) => json!({ "error": e.to_string() }),
        };
        journal.append(&Event::new(EventAction::RunEnd).with_details(details))?;
        journal.finish()?;
    }

    let outcomes = result?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_outcomes(&mut out, &outcomes, config.output_format)?;
    out.flush()
        .map_err(|e| TreeLockError::Io(format!("failed to write results: {}", e)))
}

/// Render outcomes in query order, one line each.
pub(crate) fn write_outcomes<W: Write>(
    out: &mut W,
    outcomes: &[Outcome],
    format: OutputFormat,
) -> Result<()> {
    for outcome in outcomes {
        let line = match format {
            OutputFormat::Text => outcome.granted.to_string(),
            OutputFormat::Json => outcome.to_json_line()?,
        };
        writeln!(out, "{}", line)
            .map_err(|e| TreeLockError::Io(format!("failed to write results: {}", e)))?;
    }
    Ok(())
}
