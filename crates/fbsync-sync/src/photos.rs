use crate::{Result, SyncError};
use fbsync_core::{BinaryProperty, BinaryValue, CanonicalContact};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Handsets stop showing pictures reliably above this count.
pub const MAX_DEVICE_PHOTOS: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPhoto {
    pub url: String,
    /// False when an identical file was already in place.
    pub uploaded: bool,
}

pub trait PhotoUploader {
    fn upload_photo(&mut self, uid: &str, jpeg: &[u8]) -> Result<StoredPhoto>;
}

/// The device photo directory, mounted locally (e.g. the FRITZ/fonpix share).
#[derive(Debug)]
pub struct DirectoryPhotoStore {
    dir: PathBuf,
    image_path: String,
    suffix: String,
    existing: BTreeMap<String, String>,
}

impl DirectoryPhotoStore {
    pub fn open(dir: impl Into<PathBuf>, image_path: &str) -> Result<Self> {
        let suffix = chrono::Local::now().format("%y%m%d%H%M%S").to_string();
        Self::open_with_suffix(dir, image_path, &suffix)
    }

    pub fn open_with_suffix(
        dir: impl Into<PathBuf>,
        image_path: &str,
        suffix: &str,
    ) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SyncError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("photo directory {} not found", dir.display()),
            )));
        }
        let mut existing = BTreeMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            existing.insert(photo_uid(&file_name).to_string(), file_name);
        }
        Ok(Self {
            dir,
            image_path: format!("{}/", image_path.trim_end_matches('/')),
            suffix: suffix.to_string(),
            existing,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PhotoUploader for DirectoryPhotoStore {
    fn upload_photo(&mut self, uid: &str, jpeg: &[u8]) -> Result<StoredPhoto> {
        if let Some(current) = self.existing.get(uid) {
            let path = self.dir.join(current);
            if fs::metadata(&path)?.len() == jpeg.len() as u64 {
                return Ok(StoredPhoto {
                    url: format!("{}{current}", self.image_path),
                    uploaded: false,
                });
            }
            fs::remove_file(&path)?;
        }

        let file_name = format!("{uid}_{}.jpg", self.suffix);
        fs::write(self.dir.join(&file_name), jpeg)?;
        let url = format!("{}{file_name}", self.image_path);
        self.existing.insert(uid.to_string(), file_name);
        Ok(StoredPhoto {
            url,
            uploaded: true,
        })
    }
}

/// `<uid>_<stamp>.jpg` and the older `<uid>.jpg` both map to `<uid>`. The
/// uid itself may contain `_`; only an all-digit last segment is a stamp.
fn photo_uid(file_name: &str) -> &str {
    let stem = match file_name.len().checked_sub(4) {
        Some(cut)
            if file_name.is_char_boundary(cut)
                && file_name[cut..].eq_ignore_ascii_case(".jpg") =>
        {
            &file_name[..cut]
        }
        _ => file_name,
    };
    match stem.rsplit_once('_') {
        Some((uid, stamp))
            if !uid.is_empty()
                && !stamp.is_empty()
                && stamp.bytes().all(|byte| byte.is_ascii_digit()) =>
        {
            uid
        }
        _ => stem,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoReport {
    /// Usable JPEG photos seen.
    pub total: usize,
    pub uploaded: usize,
    pub warnings: Vec<String>,
}

/// Stores every embedded JPEG photo and sets `image_url` on its contact.
/// A failed store drops the photo from the contact.
pub fn upload_photos(
    contacts: &mut [CanonicalContact],
    uploader: &mut dyn PhotoUploader,
    progress: &mut dyn FnMut(),
) -> PhotoReport {
    let mut report = PhotoReport::default();
    for contact in contacts.iter_mut() {
        progress();
        let (subtype, data) = match contact.photo() {
            None => continue,
            Some(BinaryValue::Link(link)) => {
                report.warnings.push(format!(
                    "photo of {} could not be embedded ({link}), skipped",
                    contact.id.as_deref().unwrap_or("<contact without uid>")
                ));
                continue;
            }
            Some(BinaryValue::Embedded { subtype, data }) => (subtype.as_str(), data.as_slice()),
        };
        if !is_jpeg(subtype, data) {
            continue;
        }
        let Some(uid) = contact.id.clone() else {
            report
                .warnings
                .push("photo of a contact without uid skipped".to_string());
            continue;
        };
        report.total += 1;

        match uploader.upload_photo(&uid, data) {
            Ok(stored) => {
                if stored.uploaded {
                    report.uploaded += 1;
                }
                contact.image_url = Some(stored.url);
            }
            Err(err) => {
                report
                    .warnings
                    .push(format!("storing photo of {uid} failed: {err}"));
                contact.binaries.remove(&BinaryProperty::Photo);
                contact.image_url = None;
            }
        }
    }

    if report.total > MAX_DEVICE_PHOTOS {
        report.warnings.push(format!(
            "{} contact photos stored, handsets may only show up to {MAX_DEVICE_PHOTOS}",
            report.total
        ));
    }
    report
}

fn is_jpeg(subtype: &str, data: &[u8]) -> bool {
    match subtype.to_ascii_uppercase().as_str() {
        "JPEG" | "JPG" => true,
        "" => data.starts_with(&[0xff, 0xd8]),
        _ => false,
    }
}
