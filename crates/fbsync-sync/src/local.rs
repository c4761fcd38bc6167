use crate::source::VcfSource;
use crate::Result;
use std::fs;
use std::path::PathBuf;

/// A pre-downloaded `.vcf` file.
#[derive(Debug, Clone)]
pub struct LocalVcfSource {
    path: PathBuf,
}

impl LocalVcfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VcfSource for LocalVcfSource {
    fn source_name(&self) -> &'static str {
        "local"
    }

    fn fetch_vcf(&self) -> Result<String> {
        let bytes = fs::read(&self.path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
