use crate::commands::pipeline;
use crate::commands::{print_json, read_phonebook_file, Context};
use anyhow::{anyhow, Result};
use clap::Args;
use fbsync_core::quickdial_labels;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct QuickdialArgs {
    /// Phonebook XML; read from the device when omitted
    pub input: Option<PathBuf>,
}

pub fn quickdials(ctx: &Context<'_>, args: QuickdialArgs) -> Result<()> {
    let phonebook = match args.input.as_deref() {
        Some(path) => read_phonebook_file(path)?,
        None => {
            let device = ctx.device()?;
            pipeline::download_prior(ctx, &device)?.ok_or_else(|| {
                anyhow!("device phonebook {} unavailable", ctx.config.phonebook.id)
            })?
        }
    };
    let labels = quickdial_labels(&phonebook, &ctx.config.name_separator);

    if ctx.json {
        return print_json(&labels);
    }
    for (code, label) in &labels {
        println!("{code:>2}  {label}");
    }
    Ok(())
}
