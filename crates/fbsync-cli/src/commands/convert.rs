use crate::commands::pipeline::{self, ConversionSummary};
use crate::commands::{print_json, write_output, Context};
use anyhow::Result;
use clap::Args;
use fbsync_sync::write_phonebook;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// vCard file to read
    pub source: PathBuf,
    /// Phonebook XML to write
    pub destination: PathBuf,
}

#[derive(Debug, Serialize)]
struct ConvertReport {
    output: String,
    cards: usize,
    conversion: ConversionSummary,
}

pub fn convert(ctx: &Context<'_>, args: ConvertArgs) -> Result<()> {
    let (converter, _) = pipeline::converter(ctx, false)?;
    let collected = pipeline::collect(&[], std::slice::from_ref(&args.source), false)?;
    let cards = collected.cards.len();
    let (phonebook, conversion) =
        pipeline::build_phonebook(ctx, &converter, None, collected.normalized)?;
    write_output(&args.destination, &write_phonebook(&phonebook)?)?;

    if ctx.json {
        return print_json(&ConvertReport {
            output: args.destination.display().to_string(),
            cards,
            conversion,
        });
    }
    println!(
        "Converted {} contacts into {} records: {}",
        conversion.contacts,
        conversion.records,
        args.destination.display()
    );
    Ok(())
}
