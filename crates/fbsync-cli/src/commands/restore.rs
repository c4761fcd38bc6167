use crate::commands::pipeline::read_backup;
use crate::commands::{print_json, read_phonebook_file, write_output, Context};
use anyhow::Result;
use clap::Args;
use fbsync_core::{reconcile, PreservedAttributes, ReconcileOutcome};
use fbsync_sync::write_phonebook;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Attribute CSV written by `backup`
    #[arg(long)]
    pub attributes: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
struct RestoreReport {
    output: String,
    skipped_manual: bool,
    restored: usize,
    internal_added: usize,
}

pub fn restore(ctx: &Context<'_>, args: RestoreArgs) -> Result<()> {
    let snapshot = read_backup(&args.attributes)?;
    let mut phonebook = read_phonebook_file(&args.input)?;

    let preserved = PreservedAttributes::from_snapshot(&snapshot);
    let (skipped_manual, restored, internal_added) = match reconcile(&mut phonebook, &preserved) {
        ReconcileOutcome::SkippedManual => {
            warn!("phonebook already carries quick-dial or vanity values, nothing restored");
            (true, 0, 0)
        }
        ReconcileOutcome::Merged {
            restored,
            internal_added,
        } => (false, restored, internal_added),
    };
    write_output(&args.output, &write_phonebook(&phonebook)?)?;

    if ctx.json {
        return print_json(&RestoreReport {
            output: args.output.display().to_string(),
            skipped_manual,
            restored,
            internal_added,
        });
    }
    println!(
        "Restored {restored} numbers, added {internal_added} internal contacts: {}",
        args.output.display()
    );
    Ok(())
}
