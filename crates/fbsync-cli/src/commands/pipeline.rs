use crate::commands::Context;
use crate::error::{empty_phonebook, invalid_input};
use anyhow::{Context as _, Result};
use fbsync_config::{paths, ServerConfig};
use fbsync_core::{
    apply_filters, dissolve_groups, export_phonebook, reconcile, AttributeSnapshot,
    BinaryProperty, ConversionConfig, Converter, NormalizedCard, Phonebook, PreservedAttributes,
    ReconcileOutcome,
};
use fbsync_sync::vcf::{parse_vcf_with_progress, RawCard};
use fbsync_sync::{
    parse_phonebook, upload_photos, write_phonebook, CardDavSource, DeviceTransport,
    DirectoryPhotoStore, LocalVcfSource, Normalizer, VcfSource,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where photos go and under which URL prefix the device serves them.
pub struct PhotoTarget {
    pub dir: PathBuf,
    pub image_path: String,
}

/// Builds the converter, checking the photo settings first when `image` is
/// requested.
pub fn converter(ctx: &Context<'_>, image: bool) -> Result<(Converter, Option<PhotoTarget>)> {
    let mut conversions: ConversionConfig = ctx.config.conversions.clone();
    let target = if image {
        let image_path = ctx
            .config
            .phonebook
            .image_path
            .clone()
            .ok_or_else(|| invalid_input("--image requires phonebook.image_path"))?;
        let dir = ctx
            .config
            .device
            .photo_dir
            .clone()
            .ok_or_else(|| invalid_input("--image requires device.photo_dir"))?;
        conversions.image_base_path = Some(image_path.clone());
        Some(PhotoTarget { dir, image_path })
    } else {
        None
    };
    let converter = Converter::new(conversions).with_context(|| "load conversion rules")?;
    Ok((converter, target))
}

pub fn carddav_sources(servers: &[ServerConfig]) -> Result<Vec<CardDavSource>> {
    servers
        .iter()
        .map(|server| {
            let password = fbsync_config::resolve_secret(server.password_env.as_deref())
                .with_context(|| format!("resolve password for {}", server.url))?;
            Ok(CardDavSource::new(
                server.url.clone(),
                server.user.clone(),
                password,
                server.user_agent.clone(),
            ))
        })
        .collect()
}

/// Newest modification over every source that answered.
pub fn latest_modification(sources: &[CardDavSource]) -> Option<i64> {
    sources
        .iter()
        .filter_map(|source| match source.latest_modification() {
            Ok(value) => value,
            Err(err) => {
                warn!(server = source.url(), error = %err, "modification time unavailable");
                None
            }
        })
        .max()
}

#[derive(Debug, Default)]
pub struct Collected {
    pub cards: Vec<RawCard>,
    pub normalized: Vec<NormalizedCard>,
}

/// Reads every server, then every local file. A failing server is logged and
/// skipped; a failing local file aborts.
pub fn collect(
    sources: &[CardDavSource],
    locals: &[PathBuf],
    embed_photos: bool,
) -> Result<Collected> {
    let mut collected = Collected::default();
    for source in sources {
        let raw = match source.fetch_vcf() {
            Ok(raw) => raw,
            Err(err) => {
                warn!(server = source.url(), error = %err, "source failed, skipped");
                continue;
            }
        };
        let normalizer = if embed_photos {
            Normalizer::new().with_embedding([BinaryProperty::Photo], source)
        } else {
            Normalizer::new()
        };
        let count = ingest(&raw, &normalizer, &mut collected);
        info!(server = source.url(), cards = count, "downloaded");
    }

    for path in locals {
        let raw = LocalVcfSource::new(path)
            .fetch_vcf()
            .with_context(|| format!("read {}", path.display()))?;
        let count = ingest(&raw, &Normalizer::new(), &mut collected);
        info!(file = %path.display(), cards = count, "read local file");
    }

    info!(cards = collected.cards.len(), "cards collected");
    Ok(collected)
}

fn ingest(raw: &str, normalizer: &Normalizer<'_>, collected: &mut Collected) -> usize {
    let mut parsed_count = 0usize;
    let parsed = parse_vcf_with_progress(raw, &mut || {
        parsed_count += 1;
        debug!(card = parsed_count, "card parsed");
    });
    for warning in &parsed.warnings {
        warn!("{warning}");
    }
    let (normalized, report) = normalizer.normalize_all(&parsed.cards);
    for warning in &report.warnings {
        warn!("{warning}");
    }
    if report.embedded > 0 {
        info!(embedded = report.embedded, "linked photos embedded");
    }
    let count = parsed.cards.len();
    collected.cards.extend(parsed.cards);
    collected.normalized.extend(normalized);
    count
}

#[derive(Debug, Default, serde::Serialize)]
pub struct ConversionSummary {
    pub groups: usize,
    pub excluded: usize,
    pub contacts: usize,
    pub records: usize,
    pub skipped: usize,
    pub photos_uploaded: usize,
}

/// Groups, filters, photos and conversion. An empty result is an error.
pub fn build_phonebook(
    ctx: &Context<'_>,
    converter: &Converter,
    photos: Option<&PhotoTarget>,
    cards: Vec<NormalizedCard>,
) -> Result<(Phonebook, ConversionSummary)> {
    let mut summary = ConversionSummary::default();

    let dissolved = dissolve_groups(cards);
    summary.groups = dissolved.groups;
    info!(groups = dissolved.groups, contacts = dissolved.contacts.len(), "groups dissolved");

    let filtered = apply_filters(dissolved.contacts, &ctx.config.filters);
    if filtered.include_fallback {
        info!("no include filter configured, every contact included");
    }
    summary.excluded = filtered.excluded;
    info!(
        excluded = filtered.excluded,
        remaining = filtered.contacts.len(),
        "filters applied"
    );
    let mut contacts = filtered.contacts;

    if let Some(target) = photos {
        let mut store = DirectoryPhotoStore::open(&target.dir, &target.image_path)
            .with_context(|| format!("open photo directory {}", target.dir.display()))?;
        let mut processed = 0usize;
        let report = upload_photos(&mut contacts, &mut store, &mut || {
            processed += 1;
            debug!(contact = processed, "photo checked");
        });
        for warning in &report.warnings {
            warn!("{warning}");
        }
        summary.photos_uploaded = report.uploaded;
        info!(uploaded = report.uploaded, total = report.total, "photos stored");
    }

    let (phonebook, report) = export_phonebook(converter, &ctx.config.phonebook.name, &contacts);
    for warning in &report.warnings {
        warn!("{warning}");
    }
    summary.contacts = report.contacts_in;
    summary.records = report.records_out;
    summary.skipped = report.skipped;
    info!(
        contacts = report.contacts_in,
        records = report.records_out,
        skipped = report.skipped,
        split = report.split,
        "converted"
    );

    if phonebook.contacts.is_empty() {
        return Err(empty_phonebook(format!(
            "{} contacts read, none converted",
            report.contacts_in
        )));
    }
    Ok((phonebook, summary))
}

pub fn download_prior(ctx: &Context<'_>, device: &dyn DeviceTransport) -> Result<Option<Phonebook>> {
    let phonebook = &ctx.config.phonebook;
    let Some(xml) = device
        .download_phonebook(phonebook.id, &phonebook.name)
        .with_context(|| format!("download phonebook {}", phonebook.id))?
    else {
        warn!(id = phonebook.id, "device returned no phonebook export");
        return Ok(None);
    };
    let prior = parse_phonebook(&xml).with_context(|| "parse device phonebook")?;
    info!(contacts = prior.contacts.len(), "device phonebook read");
    Ok(Some(prior))
}

#[derive(Debug, Default, serde::Serialize)]
pub struct RestoreSummary {
    pub skipped_manual: bool,
    pub restored: usize,
    pub internal_added: usize,
}

/// Brings quick-dial, vanity and internal entries over from the device
/// phonebook, or from the backup CSV when the device could not be read.
/// A live read refreshes the backup.
pub fn restore_attributes(
    ctx: &Context<'_>,
    converter: &Converter,
    prior: Option<&Phonebook>,
    phonebook: &mut Phonebook,
) -> Result<RestoreSummary> {
    let backup = ctx.config.attributes_path()?;
    let preserved = match prior {
        Some(prior) => {
            let snapshot =
                AttributeSnapshot::from_phonebook(prior, |number| converter.cleanup_number(number));
            write_backup(&backup, &snapshot)?;
            PreservedAttributes::from_snapshot(&snapshot)
        }
        None if backup.exists() => {
            warn!(path = %backup.display(), "restoring attributes from backup");
            PreservedAttributes::from_snapshot(&read_backup(&backup)?)
        }
        None => PreservedAttributes::default(),
    };

    let summary = match reconcile(phonebook, &preserved) {
        ReconcileOutcome::SkippedManual => {
            warn!("phonebook already carries quick-dial or vanity values, automatic restore skipped");
            RestoreSummary {
                skipped_manual: true,
                ..RestoreSummary::default()
            }
        }
        ReconcileOutcome::Merged {
            restored,
            internal_added,
        } => RestoreSummary {
            skipped_manual: false,
            restored,
            internal_added,
        },
    };
    info!(
        restored = summary.restored,
        internal = summary.internal_added,
        "attributes restored"
    );
    Ok(summary)
}

pub fn write_backup(path: &Path, snapshot: &AttributeSnapshot) -> Result<()> {
    paths::ensure_parent_dir(path)?;
    let csv = snapshot.to_csv()?;
    fs::write(path, csv).with_context(|| format!("write backup {}", path.display()))?;
    debug!(path = %path.display(), rows = snapshot.rows.len(), "attribute backup written");
    Ok(())
}

pub fn read_backup(path: &Path) -> Result<AttributeSnapshot> {
    let csv = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    AttributeSnapshot::from_csv(&csv).with_context(|| format!("parse {}", path.display()))
}

pub fn upload(ctx: &Context<'_>, device: &dyn DeviceTransport, phonebook: &Phonebook) -> Result<()> {
    let xml = write_phonebook(phonebook)?;
    device
        .upload_phonebook(ctx.config.phonebook.id, &xml)
        .with_context(|| format!("upload phonebook {}", ctx.config.phonebook.id))?;
    info!(
        id = ctx.config.phonebook.id,
        contacts = phonebook.contacts.len(),
        "phonebook uploaded"
    );
    Ok(())
}
