use crate::domain::{CanonicalContact, NormalizedCard};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DissolvedGroups {
    pub contacts: Vec<CanonicalContact>,
    /// Distinct group names found in the input.
    pub groups: usize,
}

/// Turns group cards into `groups` tags on their members and drops the group
/// cards. Members without a matching contact are ignored.
pub fn dissolve_groups(cards: Vec<NormalizedCard>) -> DissolvedGroups {
    let mut members_by_group: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut contacts = Vec::new();

    for card in cards {
        match card {
            NormalizedCard::Group(group) => {
                members_by_group.entry(group.name).or_default().extend(
                    group
                        .member_ids
                        .iter()
                        .map(|member| member_key(member).to_string()),
                );
            }
            NormalizedCard::Contact(contact) => contacts.push(contact),
        }
    }

    for contact in &mut contacts {
        let Some(id) = contact.id.as_deref() else {
            continue;
        };
        let key = member_key(id);
        for (name, members) in &members_by_group {
            if members.contains(key) {
                contact.groups.insert(name.clone());
            }
        }
    }

    DissolvedGroups {
        contacts,
        groups: members_by_group.len(),
    }
}

/// Group members reference contacts as `urn:uuid:<uid>`.
fn member_key(value: &str) -> &str {
    let value = value.trim();
    let value = value.strip_prefix("urn:").unwrap_or(value);
    value.strip_prefix("uuid:").unwrap_or(value)
}
