use crate::commands::pipeline::{self, RestoreSummary};
use crate::commands::{print_json, read_phonebook_file, Context};
use crate::error::empty_phonebook;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Phonebook XML to upload
    pub input: PathBuf,
}

#[derive(Debug, Serialize)]
struct UploadReport {
    contacts: usize,
    restore: RestoreSummary,
}

pub fn upload(ctx: &Context<'_>, args: UploadArgs) -> Result<()> {
    let (converter, _) = pipeline::converter(ctx, false)?;
    let mut phonebook = read_phonebook_file(&args.input)?;
    if phonebook.contacts.is_empty() {
        return Err(empty_phonebook(format!("{} has no contacts", args.input.display())));
    }
    phonebook.name = ctx.config.phonebook.name.clone();

    let device = ctx.device()?;
    let prior = pipeline::download_prior(ctx, &device)?;
    let restore = pipeline::restore_attributes(ctx, &converter, prior.as_ref(), &mut phonebook)?;
    pipeline::upload(ctx, &device, &phonebook)?;

    if ctx.json {
        return print_json(&UploadReport {
            contacts: phonebook.contacts.len(),
            restore,
        });
    }
    println!("Uploaded {} contacts", phonebook.contacts.len());
    Ok(())
}
