mod file;
pub mod paths;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use fbsync_core::{
    ConversionConfig, Converter, FilterRules, Replacement, TagAttribute, TagRules, TypeMapping,
    DEFAULT_FAX_TYPE,
};
use serde::Deserialize;
use thiserror::Error;

use file::{ConfigFile, ConversionsFile, ReplyFile, TagRulesFile};
use paths::APP_DIR;

const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_PHONEBOOK_NAME: &str = "Telefonbuch";
pub const DEFAULT_NAME_SEPARATOR: &str = ", ";
pub const DEFAULT_SUBJECT_PREFIX: &str = "Newer contact was found in phonebook";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub phonebook: PhonebookConfig,
    pub servers: Vec<ServerConfig>,
    pub device: DeviceConfig,
    pub filters: FilterRules,
    pub conversions: ConversionConfig,
    pub name_separator: String,
    pub reply: Option<ReplyConfig>,
    /// Explicit backup location; `None` means the default under the data dir.
    pub backup_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonebookConfig {
    pub id: u32,
    pub name: String,
    /// Device-side URL prefix of uploaded photos.
    pub image_path: Option<String>,
    pub upload_mode: UploadMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Like `Notify`, but skip the run when the device phonebook is newer
    /// than every source.
    IfNewer,
    /// Overwrite and mail contacts that only exist on the device.
    Notify,
    Overwrite,
}

impl UploadMode {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(UploadMode::IfNewer),
            2 => Some(UploadMode::Notify),
            3 => Some(UploadMode::Overwrite),
            _ => None,
        }
    }

    pub fn notifies(self) -> bool {
        !matches!(self, UploadMode::Overwrite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub url: String,
    pub user: String,
    pub password_env: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub url: String,
    pub user: String,
    pub password_env: Option<String>,
    /// Local mount of the device's photo directory.
    pub photo_dir: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            url: "http://fritz.box".to_string(),
            user: String::new(),
            password_env: None,
            photo_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyConfig {
    pub from: String,
    pub to: Vec<String>,
    pub subject_prefix: String,
    pub smtp_host: String,
    pub smtp_port: Option<u16>,
    pub username: Option<String>,
    pub password_env: Option<String>,
    pub tls: EmailTls,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTls {
    None,
    StartTls,
    Tls,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            phonebook: PhonebookConfig {
                id: 0,
                name: DEFAULT_PHONEBOOK_NAME.to_string(),
                image_path: None,
                upload_mode: UploadMode::Overwrite,
            },
            servers: Vec::new(),
            device: DeviceConfig::default(),
            filters: FilterRules::default(),
            conversions: default_conversions(),
            name_separator: DEFAULT_NAME_SEPARATOR.to_string(),
            reply: None,
            backup_path: None,
        }
    }
}

impl AppConfig {
    pub fn attributes_path(&self) -> Result<PathBuf> {
        match &self.backup_path {
            Some(path) => Ok(path.clone()),
            None => paths::default_attributes_path(),
        }
    }
}

fn default_conversions() -> ConversionConfig {
    ConversionConfig {
        phone_types: vec![
            TypeMapping::new("WORK", "work"),
            TypeMapping::new("HOME", "home"),
            TypeMapping::new("CELL", "mobile"),
            TypeMapping::new("FAX", DEFAULT_FAX_TYPE),
        ],
        email_types: vec![TypeMapping::new("WORK", "work"), TypeMapping::new("HOME", "home")],
        phone_replacements: vec![
            Replacement::new("(", ""),
            Replacement::new(")", ""),
            Replacement::new("/", ""),
            Replacement::new("-", ""),
        ],
        name_rules: vec![
            "{lastname}, {firstname}".to_string(),
            "{organization}".to_string(),
            "{fullname}".to_string(),
        ],
        ..ConversionConfig::default()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid config path: {0}")]
    InvalidConfigPath(PathBuf),
    #[error("invalid data path: {0}")]
    InvalidDataPath(PathBuf),
    #[error("config file not found: {0}")]
    MissingConfigFile(PathBuf),
    #[error("config file permissions too permissive: {0}")]
    InsecurePermissions(PathBuf),
    #[error("invalid forced_upload value: {0} (expected 1, 2 or 3)")]
    InvalidUploadMode(u8),
    #[error("invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("conversions.real_name must list at least one rule")]
    MissingNameRules,
    #[error("invalid conversion rule: {0}")]
    InvalidConversion(#[from] fbsync_core::CoreError),
    #[error("missing env var {0}")]
    MissingSecret(String),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let required = config_path.is_some();
    let path = match resolve_config_path(config_path.clone()) {
        Ok(path) => path,
        Err(ConfigError::MissingHomeDir) if !required => return Ok(AppConfig::default()),
        Err(ConfigError::InvalidConfigPath(_)) if !required => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    match load_at_path(&path, required)? {
        Some(config) => Ok(config),
        None => Ok(AppConfig::default()),
    }
}

pub fn resolve_config_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfigPath(path));
            }
            Ok(path)
        }
        None => {
            let base = if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
                let path = PathBuf::from(dir);
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidConfigPath(path));
                }
                path
            } else {
                let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDir)?;
                home.join(".config")
            };
            Ok(base.join(APP_DIR).join(CONFIG_FILENAME))
        }
    }
}

/// Reads a password from the named environment variable. No variable means
/// an empty password.
pub fn resolve_secret(env_name: Option<&str>) -> Result<String> {
    let Some(name) = env_name else {
        return Ok(String::new());
    };
    let value = env::var(name).map_err(|_| ConfigError::MissingSecret(name.to_string()))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::MissingSecret(name.to_string()));
    }
    Ok(value.to_string())
}

fn load_at_path(path: &Path, required: bool) -> Result<Option<AppConfig>> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        return Ok(None);
    }

    ensure_permissions(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(merge_config(parsed)?))
}

fn merge_config(parsed: ConfigFile) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(phonebook) = parsed.phonebook {
        if let Some(id) = phonebook.id {
            config.phonebook.id = id;
        }
        if let Some(name) = phonebook.name {
            config.phonebook.name = non_empty("phonebook.name", name)?;
        }
        config.phonebook.image_path = phonebook
            .image_path
            .filter(|value| !value.trim().is_empty());
        if let Some(level) = phonebook.forced_upload {
            config.phonebook.upload_mode =
                UploadMode::from_level(level).ok_or(ConfigError::InvalidUploadMode(level))?;
        }
    }

    for server in parsed.servers {
        let url = non_empty("servers.url", server.url)?;
        config.servers.push(ServerConfig {
            url,
            user: server.user.unwrap_or_default(),
            password_env: server.password_env,
            user_agent: server.user_agent,
        });
    }

    if let Some(device) = parsed.device {
        if let Some(url) = device.url {
            config.device.url = non_empty("device.url", url)?;
        }
        config.device.user = device.user.unwrap_or_default();
        config.device.password_env = device.password_env;
        config.device.photo_dir = device.photo_dir;
    }

    if let Some(filters) = parsed.filters {
        config.filters = FilterRules {
            include: filters.include.map(tag_rules).unwrap_or_default(),
            exclude: filters.exclude.map(tag_rules).unwrap_or_default(),
        };
    }

    if let Some(conversions) = parsed.conversions {
        merge_conversions(&mut config, conversions)?;
    }
    Converter::new(config.conversions.clone())?;

    if let Some(reply) = parsed.reply {
        config.reply = Some(reply_config(reply)?);
    }

    if let Some(attributes) = parsed.attributes {
        config.backup_path = attributes.backup_path;
    }

    Ok(config)
}

fn merge_conversions(config: &mut AppConfig, conversions: ConversionsFile) -> Result<()> {
    let target = &mut config.conversions;
    if let Some(rules) = conversions.real_name {
        if rules.is_empty() {
            return Err(ConfigError::MissingNameRules);
        }
        target.name_rules = rules;
    }
    if let Some(types) = conversions.phone_types {
        target.phone_types = types
            .into_iter()
            .map(|entry| TypeMapping::new(entry.pattern, entry.value))
            .collect();
    }
    if let Some(types) = conversions.email_types {
        target.email_types = types
            .into_iter()
            .map(|entry| TypeMapping::new(entry.pattern, entry.value))
            .collect();
    }
    if let Some(replacements) = conversions.phone_replace_characters {
        let mut out = Vec::with_capacity(replacements.len());
        for entry in replacements {
            if entry.from.is_empty() {
                return Err(ConfigError::InvalidField {
                    field: "conversions.phone_replace_characters.from",
                    message: "must not be empty".to_string(),
                });
            }
            out.push(Replacement::new(entry.from, entry.to));
        }
        target.phone_replacements = out;
    }
    if let Some(fax_type) = conversions.fax_type {
        target.fax_type = non_empty("conversions.fax_type", fax_type)?.to_lowercase();
    }
    if let Some(vip) = conversions.vip {
        target.vip = tag_rules(vip);
    }
    if let Some(separator) = conversions.name_separator {
        if separator.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "conversions.name_separator",
                message: "must not be empty".to_string(),
            });
        }
        config.name_separator = separator;
    }
    Ok(())
}

fn tag_rules(file: TagRulesFile) -> TagRules {
    let mut rules = TagRules::new();
    if let Some(categories) = file.categories {
        rules.insert(TagAttribute::Categories, categories);
    }
    if let Some(groups) = file.groups {
        rules.insert(TagAttribute::Groups, groups);
    }
    rules
}

fn reply_config(reply: ReplyFile) -> Result<ReplyConfig> {
    use lettre::message::Mailbox;

    reply
        .from
        .parse::<Mailbox>()
        .map_err(|err| ConfigError::InvalidField {
            field: "reply.from",
            message: err.to_string(),
        })?;
    if reply.to.is_empty() {
        return Err(ConfigError::InvalidField {
            field: "reply.to",
            message: "must list at least one address".to_string(),
        });
    }
    for raw in &reply.to {
        raw.parse::<Mailbox>()
            .map_err(|err| ConfigError::InvalidField {
                field: "reply.to",
                message: err.to_string(),
            })?;
    }
    Ok(ReplyConfig {
        from: reply.from,
        to: reply.to,
        subject_prefix: reply
            .subject_prefix
            .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
        smtp_host: non_empty("reply.smtp_host", reply.smtp_host)?,
        smtp_port: reply.smtp_port,
        username: reply.username,
        password_env: reply.password_env,
        tls: reply.tls.unwrap_or(EmailTls::StartTls),
        timeout_seconds: reply.timeout_seconds,
    })
}

fn non_empty(field: &'static str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(unix)]
fn ensure_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mode = metadata.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(ConfigError::InsecurePermissions(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_at_path, merge_config, resolve_secret, ConfigError, EmailTls, UploadMode};
    use crate::file::ConfigFile;
    use fbsync_core::TagAttribute;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn restrict_permissions(path: &Path) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path).expect("metadata").permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).expect("chmod");
        }
    }

    fn parse(input: &str) -> super::Result<super::AppConfig> {
        let parsed: ConfigFile = toml::from_str(input).expect("toml");
        merge_config(parsed)
    }

    const FULL: &str = r#"
[phonebook]
id = 1
name = "Privat"
image_path = "file:///var/media/ftp/USB/FRITZ/fonpix/"
forced_upload = 2

[[servers]]
url = "https://dav.example.com/addressbooks/ada/contacts/"
user = "ada"
password_env = "FBSYNC_DAV_PASSWORD"

[[servers]]
url = "https://other.example.com/card/"

[device]
url = "http://192.168.178.1"
user = "admin"
password_env = "FBSYNC_BOX_PASSWORD"
photo_dir = "/mnt/fritz/fonpix"

[filters.include]
category = ["family", "friends"]

[filters.exclude]
groups = ["archive"]

[conversions]
real_name = ["{lastname}, {firstname}", "{fullname}"]
phone_types = [
  { match = "WORK", type = "work" },
  { match = "CELL", type = "mobile" },
]
phone_replace_characters = [
  { from = "+49", to = "0" },
  { from = "-" },
]
name_separator = "; "

[conversions.vip]
categories = ["vip"]

[reply]
from = "fbsync <fbsync@example.com>"
to = ["Ada <ada@example.com>"]
smtp_host = "smtp.example.com"
smtp_port = 587
tls = "starttls"

[attributes]
backup_path = "/tmp/fbsync/attributes.csv"
"#;

    #[test]
    fn merge_config_applies_values() {
        let config = parse(FULL).expect("merge");
        assert_eq!(config.phonebook.id, 1);
        assert_eq!(config.phonebook.name, "Privat");
        assert_eq!(config.phonebook.upload_mode, UploadMode::Notify);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[1].user, "");
        assert_eq!(config.device.url, "http://192.168.178.1");
        assert_eq!(
            config.filters.include.values(TagAttribute::Categories),
            ["family".to_string(), "friends".to_string()]
        );
        assert_eq!(config.filters.exclude.total_values(), 1);
        assert_eq!(config.conversions.name_rules.len(), 2);
        assert_eq!(config.conversions.phone_types.len(), 2);
        assert_eq!(config.conversions.phone_replacements[1].to, "");
        assert_eq!(config.conversions.fax_type, "fax_work");
        assert_eq!(config.name_separator, "; ");
        assert!(!config.conversions.vip.is_empty());
        let reply = config.reply.expect("reply");
        assert_eq!(reply.tls, EmailTls::StartTls);
        assert_eq!(reply.subject_prefix, super::DEFAULT_SUBJECT_PREFIX);
        assert!(config.backup_path.is_some());
    }

    #[test]
    fn defaults_without_sections() {
        let config = parse("").expect("merge");
        assert_eq!(config.phonebook.name, "Telefonbuch");
        assert_eq!(config.phonebook.upload_mode, UploadMode::Overwrite);
        assert!(config.filters.include.is_empty());
        assert!(!config.conversions.name_rules.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<ConfigFile, _> = toml::from_str("[phonebook]\nforcedupload = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_name_rule_without_tokens() {
        let err = parse("[conversions]\nreal_name = [\"static\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConversion(_)));
        let err = parse("[conversions]\nreal_name = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingNameRules));
    }

    #[test]
    fn rejects_growing_phone_replacement() {
        let err = parse("[conversions]\nphone_replace_characters = [{ from = \"0\", to = \"00\" }]\n")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidConversion(fbsync_core::CoreError::GrowingReplacement { .. })
        ));
    }

    #[test]
    fn rejects_invalid_upload_mode() {
        let err = parse("[phonebook]\nforced_upload = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUploadMode(4)));
    }

    #[test]
    fn rejects_invalid_reply_address() {
        let err = parse("[reply]\nfrom = \"not an address\"\nto = [\"a@example.com\"]\nsmtp_host = \"smtp\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("reply.from"));
    }

    #[test]
    fn load_at_path_requires_file_when_requested() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("config.toml");
        let err = load_at_path(&missing, true).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("config file not found"));
        assert!(load_at_path(&missing, false).expect("optional").is_none());
    }

    #[test]
    fn load_at_path_parses_toml() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, FULL).expect("write config");
        restrict_permissions(&path);

        let config = load_at_path(&path, true).expect("load").expect("config");
        assert_eq!(config.phonebook.name, "Privat");
    }

    #[cfg(unix)]
    #[test]
    fn load_at_path_rejects_world_readable_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "").expect("write config");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");
        let err = load_at_path(&path, true).unwrap_err();
        assert!(matches!(err, ConfigError::InsecurePermissions(_)));
    }

    #[test]
    fn resolve_secret_reads_env() {
        assert_eq!(resolve_secret(None).expect("none"), "");
        std::env::set_var("FBSYNC_TEST_SECRET", " hunter2 ");
        assert_eq!(resolve_secret(Some("FBSYNC_TEST_SECRET")).expect("set"), "hunter2");
        std::env::remove_var("FBSYNC_TEST_SECRET");
        assert!(matches!(
            resolve_secret(Some("FBSYNC_TEST_SECRET_MISSING")),
            Err(ConfigError::MissingSecret(_))
        ));
    }
}
