use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub(crate) phonebook: Option<PhonebookFile>,
    #[serde(default)]
    pub(crate) servers: Vec<ServerFile>,
    pub(crate) device: Option<DeviceFile>,
    pub(crate) filters: Option<FiltersFile>,
    pub(crate) conversions: Option<ConversionsFile>,
    pub(crate) reply: Option<ReplyFile>,
    pub(crate) attributes: Option<AttributesFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PhonebookFile {
    pub(crate) id: Option<u32>,
    pub(crate) name: Option<String>,
    pub(crate) image_path: Option<String>,
    pub(crate) forced_upload: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServerFile {
    pub(crate) url: String,
    pub(crate) user: Option<String>,
    pub(crate) password_env: Option<String>,
    pub(crate) user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DeviceFile {
    pub(crate) url: Option<String>,
    pub(crate) user: Option<String>,
    pub(crate) password_env: Option<String>,
    pub(crate) photo_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FiltersFile {
    pub(crate) include: Option<TagRulesFile>,
    pub(crate) exclude: Option<TagRulesFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TagRulesFile {
    #[serde(alias = "category")]
    pub(crate) categories: Option<Vec<String>>,
    #[serde(alias = "group")]
    pub(crate) groups: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConversionsFile {
    pub(crate) real_name: Option<Vec<String>>,
    pub(crate) phone_types: Option<Vec<TypeMappingFile>>,
    pub(crate) email_types: Option<Vec<TypeMappingFile>>,
    pub(crate) phone_replace_characters: Option<Vec<ReplacementFile>>,
    pub(crate) fax_type: Option<String>,
    pub(crate) name_separator: Option<String>,
    pub(crate) vip: Option<TagRulesFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TypeMappingFile {
    #[serde(rename = "match")]
    pub(crate) pattern: String,
    #[serde(rename = "type")]
    pub(crate) value: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReplacementFile {
    pub(crate) from: String,
    #[serde(default)]
    pub(crate) to: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReplyFile {
    pub(crate) from: String,
    pub(crate) to: Vec<String>,
    pub(crate) subject_prefix: Option<String>,
    pub(crate) smtp_host: String,
    pub(crate) smtp_port: Option<u16>,
    pub(crate) username: Option<String>,
    pub(crate) password_env: Option<String>,
    pub(crate) tls: Option<crate::EmailTls>,
    pub(crate) timeout_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AttributesFile {
    pub(crate) backup_path: Option<PathBuf>,
}
