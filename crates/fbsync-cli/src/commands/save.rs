use crate::commands::pipeline;
use crate::commands::{print_json, write_output, Context};
use anyhow::{anyhow, Result};
use clap::Args;
use fbsync_sync::vcf::export_device_contacts;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SaveArgs {
    /// vCard file to write
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
struct SaveReport {
    output: String,
    contacts: usize,
}

pub fn save(ctx: &Context<'_>, args: SaveArgs) -> Result<()> {
    let device = ctx.device()?;
    let phonebook = pipeline::download_prior(ctx, &device)?
        .ok_or_else(|| anyhow!("device phonebook {} unavailable", ctx.config.phonebook.id))?;
    let contacts: Vec<_> = phonebook.contacts.iter().collect();
    write_output(
        &args.output,
        &export_device_contacts(&contacts, &ctx.config.name_separator),
    )?;

    if ctx.json {
        return print_json(&SaveReport {
            output: args.output.display().to_string(),
            contacts: contacts.len(),
        });
    }
    println!("Saved {} contacts to {}", contacts.len(), args.output.display());
    Ok(())
}
