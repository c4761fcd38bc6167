mod name;
mod number;

use crate::domain::{
    CanonicalContact, DeviceContact, DeviceEmail, DeviceNumber, Phonebook, MAX_NUMBERS_PER_CONTACT,
};
use crate::error::CoreError;
use crate::filter::TagRules;
use std::collections::HashSet;

use name::NameRule;
pub use number::{Replacement, TypeMapping};

pub const DEFAULT_FAX_TYPE: &str = "fax_work";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    pub phone_types: Vec<TypeMapping>,
    pub email_types: Vec<TypeMapping>,
    pub phone_replacements: Vec<Replacement>,
    pub name_rules: Vec<String>,
    pub vip: TagRules,
    pub fax_type: String,
    /// Photos are only linked when the device has somewhere to serve them from.
    pub image_base_path: Option<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            phone_types: Vec::new(),
            email_types: Vec::new(),
            phone_replacements: Vec::new(),
            name_rules: Vec::new(),
            vip: TagRules::default(),
            fax_type: DEFAULT_FAX_TYPE.to_string(),
            image_base_path: None,
        }
    }
}

/// State shared by every contact of one conversion run.
#[derive(Debug, Default)]
pub struct ConversionRun {
    quickdials: HashSet<String>,
    vanities: HashSet<String>,
    skipped: usize,
    split: usize,
    warnings: Vec<String>,
}

impl ConversionRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub contacts_in: usize,
    pub records_out: usize,
    /// Contacts without a usable number.
    pub skipped: usize,
    /// Contacts spread over more than one record.
    pub split: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Converter {
    config: ConversionConfig,
    name_rules: Vec<NameRule>,
    sort_order: Vec<String>,
}

impl Converter {
    pub fn new(config: ConversionConfig) -> Result<Self, CoreError> {
        let name_rules = name::parse_rules(&config.name_rules)?;
        number::check_replacements(&config.phone_replacements)?;
        let sort_order = number::sort_order(&config.phone_types);
        Ok(Self {
            config,
            name_rules,
            sort_order,
        })
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn sort_order(&self) -> &[String] {
        &self.sort_order
    }

    pub fn cleanup_number(&self, raw: &str) -> String {
        number::cleanup_number(raw, &self.config.phone_replacements)
    }

    pub fn classify_phone(&self, types: &[String]) -> String {
        number::classify_phone(types, &self.config.phone_types, &self.config.fax_type)
    }

    pub fn display_name(&self, contact: &CanonicalContact) -> Option<String> {
        name::synthesize(&self.name_rules, contact)
    }

    /// Maps one contact to device records of at most nine numbers each.
    /// Returns nothing when the contact has no usable number.
    pub fn convert(&self, contact: &CanonicalContact, run: &mut ConversionRun) -> Vec<DeviceContact> {
        let label = contact_label(contact);
        let numbers = self.phone_numbers(contact, &label, run);
        if numbers.is_empty() {
            run.skipped += 1;
            run.warnings
                .push(format!("{label}: no phone numbers, contact skipped"));
            return Vec::new();
        }
        if numbers.len() > MAX_NUMBERS_PER_CONTACT {
            run.split += 1;
            run.warnings.push(format!(
                "{label}: {} phone numbers, contact split",
                numbers.len()
            ));
        }

        let name = match self.display_name(contact) {
            Some(name) => name,
            None => {
                run.warnings
                    .push(format!("{label}: no name rule matched, name left empty"));
                String::new()
            }
        };
        let emails = self.email_addresses(contact);
        let vip = self.config.vip.matches(contact);
        let image_url = match (contact.embedded_photo(), &self.config.image_base_path) {
            (Some(_), Some(_)) => contact.image_url.clone(),
            _ => None,
        };

        numbers
            .chunks(MAX_NUMBERS_PER_CONTACT)
            .map(|chunk| DeviceContact {
                external_id: contact.id.clone(),
                name: name.clone(),
                numbers: chunk
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(index, number)| DeviceNumber { index, ..number })
                    .collect(),
                emails: emails.clone(),
                vip,
                image_url: image_url.clone(),
            })
            .collect()
    }

    fn phone_numbers(
        &self,
        contact: &CanonicalContact,
        label: &str,
        run: &mut ConversionRun,
    ) -> Vec<DeviceNumber> {
        let mut numbers = Vec::with_capacity(contact.phones.len());
        for phone in &contact.phones {
            let cleaned = self.cleanup_number(&phone.number);
            if cleaned.trim().is_empty() {
                continue;
            }
            let mut number = DeviceNumber::new(0, cleaned, self.classify_phone(&phone.types));
            if phone.has_type("PREF") {
                if let Some(quickdial) = contact.vendor_hints.quickdial.as_deref() {
                    number.quickdial = claim(
                        &mut run.quickdials,
                        quickdial,
                        "quickdial",
                        label,
                        &mut run.warnings,
                    );
                }
                if let Some(vanity) = contact.vendor_hints.vanity.as_deref() {
                    number.vanity =
                        claim(&mut run.vanities, vanity, "vanity", label, &mut run.warnings);
                }
            }
            numbers.push(number);
        }

        numbers.sort_by(|left, right| {
            self.type_rank(&left.kind)
                .cmp(&self.type_rank(&right.kind))
                .then_with(|| left.number.cmp(&right.number))
        });
        numbers
    }

    fn type_rank(&self, kind: &str) -> usize {
        self.sort_order
            .iter()
            .position(|value| value == kind)
            .unwrap_or(self.sort_order.len())
    }

    fn email_addresses(&self, contact: &CanonicalContact) -> Vec<DeviceEmail> {
        contact
            .emails
            .iter()
            .filter(|email| !email.address.trim().is_empty())
            .enumerate()
            .map(|(index, email)| DeviceEmail {
                index,
                address: email.address.trim().to_string(),
                classifier: number::classify(&email.types, &self.config.email_types),
            })
            .collect()
    }
}

fn claim(
    used: &mut HashSet<String>,
    value: &str,
    attribute: &str,
    label: &str,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if used.insert(value.to_string()) {
        Some(value.to_string())
    } else {
        warnings.push(format!(
            "{label}: {attribute} `{value}` already assigned in this run, dropped"
        ));
        None
    }
}

fn contact_label(contact: &CanonicalContact) -> String {
    if !contact.full_name.trim().is_empty() {
        return contact.full_name.trim().to_string();
    }
    contact
        .id
        .clone()
        .unwrap_or_else(|| "<contact without uid>".to_string())
}

/// Converts every contact into one phonebook, sharing a single run.
pub fn export_phonebook(
    converter: &Converter,
    name: &str,
    contacts: &[CanonicalContact],
) -> (Phonebook, ConversionReport) {
    let mut run = ConversionRun::new();
    let mut phonebook = Phonebook::new(name);
    for contact in contacts {
        phonebook.contacts.extend(converter.convert(contact, &mut run));
    }
    let report = ConversionReport {
        contacts_in: contacts.len(),
        records_out: phonebook.contacts.len(),
        skipped: run.skipped,
        split: run.split,
        warnings: run.warnings,
    };
    (phonebook, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BinaryProperty, BinaryValue, RawEmail, RawPhone};
    use crate::filter::TagAttribute;

    fn config() -> ConversionConfig {
        ConversionConfig {
            phone_types: vec![
                TypeMapping::new("WORK", "work"),
                TypeMapping::new("HOME", "home"),
                TypeMapping::new("CELL", "mobile"),
                TypeMapping::new("FAX", "fax_work"),
            ],
            email_types: vec![TypeMapping::new("WORK", "work"), TypeMapping::new("HOME", "home")],
            phone_replacements: vec![
                Replacement::new("+49", ""),
                Replacement::new("(", ""),
                Replacement::new(")", ""),
                Replacement::new("/", ""),
                Replacement::new("-", ""),
            ],
            name_rules: vec!["{lastname}, {firstname}".to_string(), "{fullname}".to_string()],
            ..ConversionConfig::default()
        }
    }

    fn converter() -> Converter {
        Converter::new(config()).unwrap()
    }

    fn contact_with(numbers: &[(&str, &[&str])]) -> CanonicalContact {
        let mut contact = CanonicalContact::with_id("uid");
        contact.full_name = "Test".to_string();
        contact.phones = numbers
            .iter()
            .map(|(number, types)| RawPhone::new(*number, types))
            .collect();
        contact
    }

    #[test]
    fn single_number_yields_one_record() {
        let records = converter().convert(&contact_with(&[("1", &["other"])]), &mut ConversionRun::new());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_id.as_deref(), Some("uid"));
        assert_eq!(records[0].numbers[0].kind, "other");
        assert_eq!(records[0].name, "Test");
    }

    #[test]
    fn contact_without_numbers_is_skipped() {
        let mut run = ConversionRun::new();
        let records = converter().convert(&contact_with(&[]), &mut run);
        assert!(records.is_empty());
        assert_eq!(run.warnings().len(), 1);
    }

    #[test]
    fn eighteen_numbers_make_two_records() {
        let values: Vec<String> = (1..=18).map(|value| format!("{value:02}")).collect();
        let numbers: Vec<(&str, &[&str])> = values
            .iter()
            .map(|value| (value.as_str(), &["voice"][..]))
            .collect();
        let mut run = ConversionRun::new();
        let records = converter().convert(&contact_with(&numbers), &mut run);

        assert_eq!(records.len(), 2);
        for (chunk, record) in records.iter().enumerate() {
            assert_eq!(record.numbers.len(), 9);
            assert_eq!(record.external_id.as_deref(), Some("uid"));
            for (index, number) in record.numbers.iter().enumerate() {
                assert_eq!(number.index, index);
                assert_eq!(number.number, format!("{:02}", chunk * 9 + index + 1));
            }
        }
        assert_eq!(run.split, 1);
    }

    #[test]
    fn numbers_follow_type_order() {
        let mut config = config();
        config.phone_types = vec![
            TypeMapping::new("WORK", "work"),
            TypeMapping::new("HOME", "home"),
            TypeMapping::new("CELL", "mobile"),
            TypeMapping::new("VOICE", "other"),
        ];
        let converter = Converter::new(config).unwrap();
        let contact = contact_with(&[("3", &["x-custom"]), ("1", &["work"]), ("2", &["home"])]);
        let records = converter.convert(&contact, &mut ConversionRun::new());
        let kinds: Vec<&str> = records[0].numbers.iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["work", "home", "other"]);
    }

    #[test]
    fn same_type_sorted_by_number() {
        let contact = contact_with(&[("0911 2", &["home"]), ("0911 1", &["home"]), ("0170", &["cell"])]);
        let records = converter().convert(&contact, &mut ConversionRun::new());
        let numbers: Vec<&str> = records[0].numbers.iter().map(|n| n.number.as_str()).collect();
        assert_eq!(numbers, vec!["0911 1", "0911 2", "0170"]);
    }

    #[test]
    fn fax_tag_wins_over_home() {
        let contact = contact_with(&[("2", &["HOME", "FAX"])]);
        let records = converter().convert(&contact, &mut ConversionRun::new());
        assert_eq!(records[0].numbers[0].kind, "fax_work");
    }

    #[test]
    fn emails_are_classified_and_not_split() {
        let values: Vec<String> = (0..10).map(|value| value.to_string()).collect();
        let numbers: Vec<(&str, &[&str])> = values.iter().map(|v| (v.as_str(), &["cell"][..])).collect();
        let mut contact = contact_with(&numbers);
        contact.emails = vec![
            RawEmail::new("work@example.com", &["INTERNET", "WORK"]),
            RawEmail::new("misc@example.com", &["INTERNET"]),
        ];
        let records = converter().convert(&contact, &mut ConversionRun::new());
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.emails.len(), 2);
            assert_eq!(record.emails[0].classifier.as_deref(), Some("work"));
            assert_eq!(record.emails[1].classifier, None);
            assert_eq!(record.emails[1].index, 1);
        }
    }

    #[test]
    fn vip_from_categories_or_groups() {
        let mut config = config();
        config.vip = TagRules::new()
            .with(TagAttribute::Categories, ["vip1"])
            .with(TagAttribute::Groups, ["PERS"]);
        let converter = Converter::new(config).unwrap();

        let mut contact = contact_with(&[("1", &["home"])]);
        assert!(!converter.convert(&contact, &mut ConversionRun::new())[0].vip);
        contact.groups.insert("PERS".to_string());
        assert!(converter.convert(&contact, &mut ConversionRun::new())[0].vip);
    }

    #[test]
    fn quickdial_hint_needs_pref_and_is_unique_per_run() {
        let converter = converter();
        let mut run = ConversionRun::new();

        let mut first = contact_with(&[("1", &["home", "pref"]), ("2", &["work"])]);
        first.vendor_hints.quickdial = Some("7".to_string());
        first.vendor_hints.vanity = Some("HOME".to_string());
        let mut second = contact_with(&[("3", &["cell", "pref"])]);
        second.id = Some("other".to_string());
        second.vendor_hints.quickdial = Some("7".to_string());

        let records = converter.convert(&first, &mut run);
        let home = records[0].numbers.iter().find(|n| n.number == "1").unwrap();
        assert_eq!(home.quickdial.as_deref(), Some("7"));
        assert_eq!(home.vanity.as_deref(), Some("HOME"));
        let work = records[0].numbers.iter().find(|n| n.number == "2").unwrap();
        assert_eq!(work.quickdial, None);

        let records = converter.convert(&second, &mut run);
        assert_eq!(records[0].numbers[0].quickdial, None);
        assert_eq!(run.warnings().len(), 1);
    }

    #[test]
    fn photo_url_needs_embedded_photo_and_base_path() {
        let mut contact = contact_with(&[("1", &["home"])]);
        contact.image_url = Some("file:///pix/uid.jpg".to_string());
        contact.binaries.insert(
            BinaryProperty::Photo,
            BinaryValue::Embedded {
                subtype: "JPEG".to_string(),
                data: vec![0xff, 0xd8],
            },
        );

        let records = converter().convert(&contact, &mut ConversionRun::new());
        assert_eq!(records[0].image_url, None);

        let mut config = config();
        config.image_base_path = Some("file:///pix/".to_string());
        let converter = Converter::new(config).unwrap();
        let records = converter.convert(&contact, &mut ConversionRun::new());
        assert_eq!(records[0].image_url.as_deref(), Some("file:///pix/uid.jpg"));

        contact.binaries.insert(
            BinaryProperty::Photo,
            BinaryValue::Link("https://example.com/a.jpg".to_string()),
        );
        let records = converter.convert(&contact, &mut ConversionRun::new());
        assert_eq!(records[0].image_url, None);
    }

    #[test]
    fn invalid_name_rule_fails_construction() {
        let mut config = config();
        config.name_rules.push("static".to_string());
        assert!(matches!(
            Converter::new(config),
            Err(CoreError::InvalidNameRule(_))
        ));
    }

    #[test]
    fn growing_replacement_fails_construction() {
        let mut config = config();
        config.phone_replacements.push(Replacement::new("0", "00"));
        assert!(matches!(
            Converter::new(config),
            Err(CoreError::GrowingReplacement { .. })
        ));
    }

    #[test]
    fn export_counts_records() {
        let contacts = vec![
            contact_with(&[("1", &["home"])]),
            contact_with(&[]),
            contact_with(&[("2", &["home"]), ("3", &["work"])]),
        ];
        let (phonebook, report) = export_phonebook(&converter(), "Telefonbuch", &contacts);
        assert_eq!(phonebook.name, "Telefonbuch");
        assert_eq!(phonebook.contacts.len(), 2);
        assert_eq!(report.contacts_in, 3);
        assert_eq!(report.records_out, 2);
        assert_eq!(report.skipped, 1);
    }
}
