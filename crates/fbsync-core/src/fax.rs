use crate::domain::Phonebook;
use serde::Serialize;

/// One entry for the legacy fax address database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FaxRecord {
    pub display_name: String,
    pub fax_number: String,
    /// Set when the name does not split into last and first name.
    pub organization: String,
    pub last_name: String,
    pub first_name: String,
}

/// Every number of type `fax_type`, in phonebook order. A name of the form
/// `last<separator>first` fills the person fields, anything else the
/// organization.
pub fn extract_fax_records(phonebook: &Phonebook, fax_type: &str, separator: &str) -> Vec<FaxRecord> {
    phonebook
        .numbers()
        .filter(|(_, number)| number.kind.eq_ignore_ascii_case(fax_type))
        .map(|(contact, number)| {
            let mut record = FaxRecord {
                display_name: contact.name.clone(),
                fax_number: number.number.clone(),
                ..FaxRecord::default()
            };
            match split_name(&contact.name, separator) {
                Some((last, first)) => {
                    record.last_name = last.to_string();
                    record.first_name = first.to_string();
                }
                None => record.organization = contact.name.clone(),
            }
            record
        })
        .collect()
}

/// Splits into exactly two parts or not at all.
pub fn split_name<'a>(name: &'a str, separator: &str) -> Option<(&'a str, &'a str)> {
    if separator.is_empty() {
        return None;
    }
    let mut parts = name.split(separator);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(last), Some(first), None) => Some((last, first)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceContact, DeviceNumber};

    fn phonebook() -> Phonebook {
        let mut phonebook = Phonebook::new("Telefonbuch");
        phonebook.contacts = vec![
            DeviceContact {
                name: "Mustermann, Max".to_string(),
                numbers: vec![
                    DeviceNumber::new(0, "0911 1", "home"),
                    DeviceNumber::new(1, "0911 2", "fax_work"),
                ],
                ..DeviceContact::default()
            },
            DeviceContact {
                name: "ACME GmbH".to_string(),
                numbers: vec![DeviceNumber::new(0, "0911 3", "fax_work")],
                ..DeviceContact::default()
            },
            DeviceContact {
                name: "No Fax".to_string(),
                numbers: vec![DeviceNumber::new(0, "0911 4", "work")],
                ..DeviceContact::default()
            },
        ];
        phonebook
    }

    #[test]
    fn extracts_fax_numbers_in_order() {
        let records = extract_fax_records(&phonebook(), "fax_work", ", ");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fax_number, "0911 2");
        assert_eq!(records[0].last_name, "Mustermann");
        assert_eq!(records[0].first_name, "Max");
        assert_eq!(records[0].organization, "");
        assert_eq!(records[1].display_name, "ACME GmbH");
        assert_eq!(records[1].organization, "ACME GmbH");
    }

    #[test]
    fn no_fax_numbers_is_empty() {
        let mut phonebook = phonebook();
        phonebook.contacts.truncate(0);
        assert!(extract_fax_records(&phonebook, "fax_work", ", ").is_empty());
    }

    #[test]
    fn split_needs_exactly_two_parts() {
        assert_eq!(split_name("a, b", ", "), Some(("a", "b")));
        assert_eq!(split_name("a, b, c", ", "), None);
        assert_eq!(split_name("abc", ", "), None);
    }
}
