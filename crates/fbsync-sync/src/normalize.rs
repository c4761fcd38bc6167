use crate::vcf::{RawCard, VcfProperty};
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fbsync_core::{
    BinaryProperty, BinaryValue, CanonicalContact, GroupCard, NameParts, NormalizedCard, RawEmail,
    RawPhone,
};
use std::collections::BTreeSet;

/// Payload behind a linked PHOTO/LOGO/SOUND/KEY property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedData {
    pub mime_type: String,
    pub data: Vec<u8>,
}

pub trait LinkedDataFetcher {
    /// `Ok(None)` when the link did not resolve to data.
    fn fetch_linked(&self, uri: &str) -> Result<Option<LinkedData>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub contacts: usize,
    pub groups: usize,
    pub embedded: usize,
    pub warnings: Vec<String>,
}

#[derive(Default)]
pub struct Normalizer<'a> {
    embed: BTreeSet<BinaryProperty>,
    fetcher: Option<&'a dyn LinkedDataFetcher>,
}

impl<'a> Normalizer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links of `properties` are replaced by their data when `fetcher`
    /// resolves them.
    pub fn with_embedding(
        mut self,
        properties: impl IntoIterator<Item = BinaryProperty>,
        fetcher: &'a dyn LinkedDataFetcher,
    ) -> Self {
        self.embed.extend(properties);
        self.fetcher = Some(fetcher);
        self
    }

    pub fn normalize_all(&self, cards: &[RawCard]) -> (Vec<NormalizedCard>, NormalizeReport) {
        let mut report = NormalizeReport::default();
        let normalized = cards
            .iter()
            .map(|card| self.normalize(card, &mut report))
            .collect();
        (normalized, report)
    }

    pub fn normalize(&self, card: &RawCard, report: &mut NormalizeReport) -> NormalizedCard {
        if is_group(card) {
            report.groups += 1;
            return NormalizedCard::Group(group_card(card));
        }
        report.contacts += 1;
        NormalizedCard::Contact(self.contact(card, report))
    }

    fn contact(&self, card: &RawCard, report: &mut NormalizeReport) -> CanonicalContact {
        let mut contact = CanonicalContact {
            id: card.text("UID"),
            full_name: card.text("FN").unwrap_or_default(),
            nickname: card.text("NICKNAME").unwrap_or_default(),
            ..CanonicalContact::default()
        };
        if let Some(n) = card.first("N") {
            contact.name = name_parts(n);
        }
        if let Some(org) = card.first("ORG") {
            contact.organization = org
                .components()
                .into_iter()
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
        }

        for property in &card.properties {
            match property.name.as_str() {
                "UID" | "FN" | "N" | "NICKNAME" | "ORG" | "VERSION" | "PRODID" | "REV" => {}
                "TEL" => {
                    let number = property.text().trim().to_string();
                    if !number.is_empty() {
                        contact.phones.push(RawPhone {
                            number,
                            types: property.types(),
                        });
                    }
                }
                "EMAIL" => {
                    let address = property.text().trim().to_string();
                    if !address.is_empty() {
                        contact.emails.push(RawEmail {
                            address,
                            types: property.types(),
                        });
                    }
                }
                "CATEGORIES" => contact.categories.extend(property.list()),
                "X-FB-QUICKDIAL" => contact.vendor_hints.quickdial = non_empty(property.text()),
                "X-FB-VANITY" => contact.vendor_hints.vanity = non_empty(property.text()),
                name => match BinaryProperty::from_vcard_name(name) {
                    Some(kind) => {
                        if let Some(value) = self.binary(kind, property, &contact, report) {
                            contact.binaries.entry(kind).or_insert(value);
                        }
                    }
                    None => {
                        contact
                            .extensions
                            .entry(name.to_string())
                            .or_insert_with(|| property.text());
                    }
                },
            }
        }

        contact
    }

    fn binary(
        &self,
        kind: BinaryProperty,
        property: &VcfProperty,
        contact: &CanonicalContact,
        report: &mut NormalizeReport,
    ) -> Option<BinaryValue> {
        let value = property.value.trim();
        if value.is_empty() {
            return None;
        }
        if let Some(rest) = value.strip_prefix("data:") {
            return match decode_data_uri(rest) {
                Some(embedded) => Some(embedded),
                None => {
                    report.warnings.push(format!(
                        "{}: malformed {} data uri ignored",
                        label(contact),
                        kind.vcard_name()
                    ));
                    None
                }
            };
        }

        let encoding = property.param("ENCODING").unwrap_or("");
        let inline = encoding.eq_ignore_ascii_case("b") || encoding.eq_ignore_ascii_case("base64");
        if inline {
            let compact: String = value.chars().filter(|ch| !ch.is_whitespace()).collect();
            return match STANDARD.decode(compact.as_bytes()) {
                Ok(data) => Some(BinaryValue::Embedded {
                    subtype: inline_subtype(property),
                    data,
                }),
                Err(err) => {
                    report.warnings.push(format!(
                        "{}: {} is not valid base64: {err}",
                        label(contact),
                        kind.vcard_name()
                    ));
                    None
                }
            };
        }

        let link = property.text().trim().to_string();
        let Some(fetcher) = self.fetcher.filter(|_| self.embed.contains(&kind)) else {
            return Some(BinaryValue::Link(link));
        };
        match fetcher.fetch_linked(&link) {
            Ok(Some(linked)) => {
                report.embedded += 1;
                Some(BinaryValue::Embedded {
                    subtype: mime_subtype(&linked.mime_type),
                    data: linked.data,
                })
            }
            Ok(None) => {
                report.warnings.push(format!(
                    "{}: {} link {link} did not resolve, kept as link",
                    label(contact),
                    kind.vcard_name()
                ));
                Some(BinaryValue::Link(link))
            }
            Err(err) => {
                report.warnings.push(format!(
                    "{}: fetching {} link {link} failed: {err}",
                    label(contact),
                    kind.vcard_name()
                ));
                Some(BinaryValue::Link(link))
            }
        }
    }
}

fn is_group(card: &RawCard) -> bool {
    ["X-ADDRESSBOOKSERVER-KIND", "KIND"].iter().any(|name| {
        card.text(name)
            .is_some_and(|kind| kind.eq_ignore_ascii_case("group"))
    })
}

fn group_card(card: &RawCard) -> GroupCard {
    let name = card
        .text("FN")
        .or_else(|| card.first("N").map(|n| name_parts(n).last))
        .unwrap_or_default();
    let member_ids = card
        .properties
        .iter()
        .filter(|property| {
            property.name == "X-ADDRESSBOOKSERVER-MEMBER" || property.name == "MEMBER"
        })
        .map(|property| property.text().trim().to_string())
        .filter(|member| !member.is_empty())
        .collect();
    GroupCard { name, member_ids }
}

fn name_parts(property: &VcfProperty) -> NameParts {
    NameParts::from_components(property.components())
}

/// `image/jpeg;base64,<data>` after the `data:` prefix.
fn decode_data_uri(rest: &str) -> Option<BinaryValue> {
    let (header, payload) = rest.split_once(',')?;
    let mut header_parts = header.split(';');
    let mime = header_parts.next().unwrap_or("");
    if !header_parts.any(|part| part.eq_ignore_ascii_case("base64")) {
        return None;
    }
    let compact: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
    let data = STANDARD.decode(compact.as_bytes()).ok()?;
    Some(BinaryValue::Embedded {
        subtype: mime_subtype(mime),
        data,
    })
}

fn inline_subtype(property: &VcfProperty) -> String {
    property
        .types()
        .into_iter()
        .find(|value| !value.eq_ignore_ascii_case("PREF"))
        .map(|value| mime_subtype(&value))
        .unwrap_or_default()
}

/// `image/jpeg` and `jpeg` both become `JPEG`.
fn mime_subtype(mime: &str) -> String {
    let subtype = mime.rsplit('/').next().unwrap_or(mime);
    let subtype = subtype.split(';').next().unwrap_or(subtype);
    subtype.trim().to_ascii_uppercase()
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn label(contact: &CanonicalContact) -> String {
    if !contact.full_name.is_empty() {
        contact.full_name.clone()
    } else {
        contact.id.clone().unwrap_or_else(|| "<contact without uid>".to_string())
    }
}
