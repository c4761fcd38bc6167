use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    pub last: String,
    pub first: String,
    pub additional: String,
    pub prefix: String,
    pub suffix: String,
}

impl NameParts {
    /// Takes the components of a structured `N` value in order
    /// (`last;first;additional;prefix;suffix`). Missing trailing parts stay
    /// empty and extra parts are ignored.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parts = components
            .into_iter()
            .map(|part| part.as_ref().trim().to_string());
        Self {
            last: parts.next().unwrap_or_default(),
            first: parts.next().unwrap_or_default(),
            additional: parts.next().unwrap_or_default(),
            prefix: parts.next().unwrap_or_default(),
            suffix: parts.next().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPhone {
    pub number: String,
    pub types: Vec<String>,
}

impl RawPhone {
    pub fn new(number: impl Into<String>, types: &[&str]) -> Self {
        Self {
            number: number.into(),
            types: types.iter().map(|value| value.to_string()).collect(),
        }
    }

    pub fn has_type(&self, needle: &str) -> bool {
        joined_types(&self.types).contains(&needle.to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEmail {
    pub address: String,
    pub types: Vec<String>,
}

impl RawEmail {
    pub fn new(address: impl Into<String>, types: &[&str]) -> Self {
        Self {
            address: address.into(),
            types: types.iter().map(|value| value.to_string()).collect(),
        }
    }
}

/// Upper-cased type tags joined with `;` so substring tests never match
/// across two tags.
pub fn joined_types(types: &[String]) -> String {
    types
        .iter()
        .map(|value| value.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinaryProperty {
    Photo,
    Logo,
    Sound,
    Key,
}

impl BinaryProperty {
    pub const ALL: [BinaryProperty; 4] = [
        BinaryProperty::Photo,
        BinaryProperty::Logo,
        BinaryProperty::Sound,
        BinaryProperty::Key,
    ];

    pub fn vcard_name(self) -> &'static str {
        match self {
            BinaryProperty::Photo => "PHOTO",
            BinaryProperty::Logo => "LOGO",
            BinaryProperty::Sound => "SOUND",
            BinaryProperty::Key => "KEY",
        }
    }

    pub fn from_vcard_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|property| property.vcard_name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryValue {
    Embedded { subtype: String, data: Vec<u8> },
    Link(String),
}

impl BinaryValue {
    pub fn is_link(&self) -> bool {
        matches!(self, BinaryValue::Link(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorHints {
    pub quickdial: Option<String>,
    pub vanity: Option<String>,
}

impl VendorHints {
    pub fn is_empty(&self) -> bool {
        self.quickdial.is_none() && self.vanity.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalContact {
    pub id: Option<String>,
    pub name: NameParts,
    pub full_name: String,
    pub nickname: String,
    pub organization: String,
    pub phones: Vec<RawPhone>,
    pub emails: Vec<RawEmail>,
    pub categories: BTreeSet<String>,
    pub groups: BTreeSet<String>,
    pub binaries: BTreeMap<BinaryProperty, BinaryValue>,
    pub vendor_hints: VendorHints,
    pub image_url: Option<String>,
    pub extensions: BTreeMap<String, String>,
}

impl CanonicalContact {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn photo(&self) -> Option<&BinaryValue> {
        self.binaries.get(&BinaryProperty::Photo)
    }

    /// Returns the photo only when its data is inline; an unresolved link is
    /// treated as "no photo".
    pub fn embedded_photo(&self) -> Option<(&str, &[u8])> {
        match self.photo()? {
            BinaryValue::Embedded { subtype, data } => Some((subtype.as_str(), data.as_slice())),
            BinaryValue::Link(_) => None,
        }
    }

    /// Resolves a name-rule token. Unknown tokens fall back to the extension
    /// map, keyed by the upper-cased vCard property name.
    pub fn field(&self, token: &str) -> Option<&str> {
        let value = match token.to_ascii_lowercase().as_str() {
            "lastname" => self.name.last.as_str(),
            "firstname" => self.name.first.as_str(),
            "additional" => self.name.additional.as_str(),
            "prefix" => self.name.prefix.as_str(),
            "suffix" => self.name.suffix.as_str(),
            "fullname" => self.full_name.as_str(),
            "nickname" => self.nickname.as_str(),
            "organization" => self.organization.as_str(),
            _ => self
                .extensions
                .get(&token.to_ascii_uppercase())
                .map(String::as_str)
                .unwrap_or(""),
        };
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCard {
    pub name: String,
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedCard {
    Contact(CanonicalContact),
    Group(GroupCard),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_parts_fill_missing_trailing_parts() {
        let parts = NameParts::from_components(["Lovelace", " Ada "]);
        assert_eq!(parts.last, "Lovelace");
        assert_eq!(parts.first, "Ada");
        assert_eq!(parts.additional, "");
        assert_eq!(parts.suffix, "");
    }

    #[test]
    fn name_parts_keep_all_five() {
        let parts = NameParts::from_components(["Hopper", "Grace", "Brewster", "Rear Admiral", "PhD", "extra"]);
        assert_eq!(parts.additional, "Brewster");
        assert_eq!(parts.prefix, "Rear Admiral");
        assert_eq!(parts.suffix, "PhD");
    }

    #[test]
    fn field_lookup_ignores_empty_values() {
        let mut contact = CanonicalContact::with_id("uid");
        contact.organization = "  ".to_string();
        contact.extensions.insert("X-TITLE".to_string(), "Chief".to_string());
        assert_eq!(contact.field("organization"), None);
        assert_eq!(contact.field("x-title"), Some("Chief"));
        assert_eq!(contact.field("unknown"), None);
    }

    #[test]
    fn embedded_photo_skips_links() {
        let mut contact = CanonicalContact::with_id("uid");
        contact.binaries.insert(
            BinaryProperty::Photo,
            BinaryValue::Link("https://example.com/a.jpg".to_string()),
        );
        assert!(contact.embedded_photo().is_none());
    }
}
