use crate::commands::fax::write_fax_records;
use crate::commands::pipeline::{self, ConversionSummary, RestoreSummary};
use crate::commands::{print_json, Context};
use crate::notify::{ContactReply, LogNotifier, Notifier};
use anyhow::Result;
use clap::Args;
use fbsync_config::UploadMode;
use fbsync_core::{device_only_contacts, extract_fax_records, Phonebook};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Store contact photos in the device photo directory
    #[arg(long)]
    pub image: bool,
    /// Additional local .vcf files
    #[arg(long = "local", value_name = "FILE")]
    pub locals: Vec<PathBuf>,
    /// Write fax address records as CSV
    #[arg(long, value_name = "FILE")]
    pub fax_out: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
struct RunReport {
    skipped_newer: bool,
    cards: usize,
    conversion: ConversionSummary,
    restore: RestoreSummary,
    notified: usize,
    fax_records: usize,
}

pub fn run(ctx: &Context<'_>, args: RunArgs) -> Result<()> {
    let (converter, photos) = pipeline::converter(ctx, args.image)?;
    let sources = pipeline::carddav_sources(&ctx.config.servers)?;
    let device = ctx.device()?;
    let prior = pipeline::download_prior(ctx, &device)?;
    let mut report = RunReport::default();

    if ctx.config.phonebook.upload_mode == UploadMode::IfNewer {
        let device_updated = prior.as_ref().and_then(|prior| prior.timestamp);
        let sources_updated = pipeline::latest_modification(&sources);
        if device_updated.unwrap_or(0) > sources_updated.unwrap_or(0) {
            info!("device phonebook is newer than every source, nothing to upload");
            report.skipped_newer = true;
            return finish(ctx, &report);
        }
    }

    let collected = pipeline::collect(&sources, &args.locals, args.image)?;
    report.cards = collected.cards.len();
    let (mut phonebook, conversion) =
        pipeline::build_phonebook(ctx, &converter, photos.as_ref(), collected.normalized)?;
    report.conversion = conversion;

    report.restore = pipeline::restore_attributes(ctx, &converter, prior.as_ref(), &mut phonebook)?;
    pipeline::upload(ctx, &device, &phonebook)?;

    if ctx.config.phonebook.upload_mode.notifies() {
        if let Some(prior) = prior.as_ref() {
            report.notified = notify_device_only(ctx, prior, &phonebook)?;
        }
    }

    if let Some(path) = args.fax_out.as_deref() {
        let records = extract_fax_records(
            &phonebook,
            &ctx.config.conversions.fax_type,
            &ctx.config.name_separator,
        );
        write_fax_records(path, &records)?;
        report.fax_records = records.len();
        info!(records = records.len(), path = %path.display(), "fax records written");
    }

    finish(ctx, &report)
}

fn finish(ctx: &Context<'_>, report: &RunReport) -> Result<()> {
    if ctx.json {
        return print_json(report);
    }
    if report.skipped_newer {
        println!("Device phonebook is up to date");
    } else {
        println!(
            "Uploaded {} records from {} cards",
            report.conversion.records, report.cards
        );
    }
    Ok(())
}

/// Sends every contact that only exists on the device back to the owner.
fn notify_device_only(ctx: &Context<'_>, prior: &Phonebook, current: &Phonebook) -> Result<usize> {
    let contacts = device_only_contacts(prior, current);
    if contacts.is_empty() {
        return Ok(0);
    }
    let notifier = notifier(ctx)?;
    let subject_prefix = ctx
        .config
        .reply
        .as_ref()
        .map(|reply| reply.subject_prefix.as_str())
        .unwrap_or(fbsync_config::DEFAULT_SUBJECT_PREFIX);

    let mut sent = 0;
    for contact in contacts {
        let reply = ContactReply::new(
            contact,
            subject_prefix,
            &ctx.config.phonebook.name,
            &ctx.config.name_separator,
        );
        match notifier.send(&reply) {
            Ok(()) => sent += 1,
            Err(err) => warn!(contact = %contact.name, error = %err, "notification failed"),
        }
    }
    info!(sent, "device-only contacts reported");
    Ok(sent)
}

#[cfg(feature = "email-notify")]
fn notifier(ctx: &Context<'_>) -> Result<Box<dyn Notifier>> {
    match ctx.config.reply.as_ref() {
        Some(reply) => Ok(Box::new(crate::notify::EmailNotifier::new(reply)?)),
        None => Ok(Box::new(LogNotifier)),
    }
}

#[cfg(not(feature = "email-notify"))]
fn notifier(ctx: &Context<'_>) -> Result<Box<dyn Notifier>> {
    if ctx.config.reply.is_some() {
        warn!("reply mail configured but email-notify is disabled, logging instead");
    }
    Ok(Box::new(LogNotifier))
}
