use crate::domain::Phonebook;
use crate::fax::split_name;
use std::collections::BTreeMap;

const LABEL_WIDTH: usize = 10;

/// Quick-dial code to short label, lowest code first. Codes that are not
/// numbers are left out.
pub fn quickdial_labels(phonebook: &Phonebook, separator: &str) -> BTreeMap<u32, String> {
    let mut labels = BTreeMap::new();
    for (contact, number) in phonebook.numbers() {
        let Some(code) = number
            .quickdial
            .as_deref()
            .and_then(|value| value.trim().parse::<u32>().ok())
        else {
            continue;
        };
        let name = match split_name(&contact.name, separator) {
            Some((_, first)) => first,
            None => contact.name.as_str(),
        };
        let label: String = name.replace("Dr. ", "").chars().take(LABEL_WIDTH).collect();
        labels.insert(code, label);
    }
    labels
}
