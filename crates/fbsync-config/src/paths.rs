use crate::{ConfigError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const APP_DIR: &str = "fbsync";
const ATTRIBUTES_FILENAME: &str = "attributes.csv";

pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_DATA_HOME") {
        let path = PathBuf::from(dir);
        if path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidDataPath(path));
        }
        return Ok(path.join(APP_DIR));
    }

    let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDir)?;
    Ok(home.join(".local").join("share").join(APP_DIR))
}

pub fn default_attributes_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(ATTRIBUTES_FILENAME))
}

/// Creates the parent directory of a data file, owner-only when it is new.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
        path: parent.to_path_buf(),
        source,
    })?;
    restrict_dir_permissions(parent)
}

#[cfg(unix)]
fn restrict_dir_permissions(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o700);
    fs::set_permissions(dir, perms).map_err(|source| ConfigError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(not(unix))]
fn restrict_dir_permissions(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ensure_parent_dir;
    use tempfile::TempDir;

    #[test]
    fn ensure_parent_dir_creates_missing_directories() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("a").join("b").join("attributes.csv");
        ensure_parent_dir(&path).expect("create");
        assert!(path.parent().expect("parent").is_dir());
    }
}
