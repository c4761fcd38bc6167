use crate::commands::pipeline;
use crate::commands::{print_json, Context};
use anyhow::{anyhow, Result};
use clap::Args;
use fbsync_core::AttributeSnapshot;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct BackupArgs {
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct BackupReport {
    output: String,
    rows: usize,
}

pub fn backup(ctx: &Context<'_>, args: BackupArgs) -> Result<()> {
    let out = match args.out {
        Some(path) => path,
        None => ctx.config.attributes_path()?,
    };
    let (converter, _) = pipeline::converter(ctx, false)?;

    let device = ctx.device()?;
    let prior = pipeline::download_prior(ctx, &device)?
        .ok_or_else(|| anyhow!("device phonebook {} unavailable", ctx.config.phonebook.id))?;
    let snapshot =
        AttributeSnapshot::from_phonebook(&prior, |number| converter.cleanup_number(number));
    pipeline::write_backup(&out, &snapshot)?;

    if ctx.json {
        return print_json(&BackupReport {
            output: out.display().to_string(),
            rows: snapshot.rows.len(),
        });
    }

    println!("Backup of {} numbers written to {}", snapshot.rows.len(), out.display());
    Ok(())
}
