use crate::domain::{
    is_device_hosted, is_internal_number, normalize_number_key, DeviceContact, Phonebook,
};
use std::collections::HashSet;

/// Contacts of `prior` none of whose regular numbers appear anywhere in
/// `current`. Contacts with only internal or device-hosted numbers are never
/// reported.
pub fn device_only_contacts<'a>(prior: &'a Phonebook, current: &Phonebook) -> Vec<&'a DeviceContact> {
    let known: HashSet<String> = current
        .numbers()
        .map(|(_, number)| normalize_number_key(&number.number))
        .filter(|key| !key.is_empty())
        .collect();

    prior
        .contacts
        .iter()
        .filter(|contact| {
            let mut regular = contact
                .numbers
                .iter()
                .filter(|number| {
                    !is_internal_number(&number.number) && !is_device_hosted(&number.number)
                })
                .map(|number| normalize_number_key(&number.number))
                .filter(|key| !key.is_empty())
                .peekable();
            regular.peek().is_some() && regular.all(|key| !known.contains(&key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceNumber;

    fn contact(name: &str, numbers: &[&str]) -> DeviceContact {
        DeviceContact {
            name: name.to_string(),
            numbers: numbers
                .iter()
                .enumerate()
                .map(|(index, number)| DeviceNumber::new(index, *number, "home"))
                .collect(),
            ..DeviceContact::default()
        }
    }

    #[test]
    fn reports_contacts_missing_from_current() {
        let mut prior = Phonebook::new("Telefonbuch");
        prior.contacts = vec![
            contact("Known", &["0911 123"]),
            contact("New on device", &["0170 555"]),
            contact("Handsets", &["**610", "**611"]),
            contact("Hosted", &["620@hd-telefonie.avm.de"]),
            contact("Partly known", &["0170 999", "0911-123"]),
        ];
        let mut current = Phonebook::new("Telefonbuch");
        current.contacts = vec![contact("Known", &["0911123"])];

        let names: Vec<&str> = device_only_contacts(&prior, &current)
            .into_iter()
            .map(|contact| contact.name.as_str())
            .collect();
        assert_eq!(names, vec!["New on device"]);
    }
}
