use crate::commands::pipeline;
use crate::commands::{print_json, write_output, Context};
use anyhow::Result;
use clap::Args;
use fbsync_core::NormalizedCard;
use fbsync_sync::vcf::with_inline_photo;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[arg(long)]
    pub out: PathBuf,
    /// Embed linked photos into the written cards
    #[arg(long)]
    pub image: bool,
}

#[derive(Debug, Serialize)]
struct DownloadReport {
    output: String,
    cards: usize,
}

pub fn download(ctx: &Context<'_>, args: DownloadArgs) -> Result<()> {
    let sources = pipeline::carddav_sources(&ctx.config.servers)?;
    let collected = pipeline::collect(&sources, &[], args.image)?;

    let mut out = String::new();
    for (card, normalized) in collected.cards.iter().zip(&collected.normalized) {
        let embedded = match normalized {
            NormalizedCard::Contact(contact) if args.image => contact.embedded_photo(),
            _ => None,
        };
        match embedded {
            Some((subtype, data)) => out.push_str(&with_inline_photo(card, subtype, data)),
            None => out.push_str(&card.source),
        }
    }
    write_output(&args.out, &out)?;

    if ctx.json {
        return print_json(&DownloadReport {
            output: args.out.display().to_string(),
            cards: collected.cards.len(),
        });
    }
    println!(
        "Downloaded {} cards to {}",
        collected.cards.len(),
        args.out.display()
    );
    Ok(())
}
