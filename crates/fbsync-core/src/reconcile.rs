use crate::attributes::{AttributeRow, AttributeSnapshot};
use crate::domain::{composite_key, DeviceContact, Phonebook};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedAttribute {
    pub quickdial: Option<String>,
    pub vanity: Option<String>,
}

/// Device-only state recovered from a prior phonebook, keyed by
/// `normalized-number@uid`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedAttributes {
    pub attributes: BTreeMap<String, PreservedAttribute>,
    /// Rows of internal numbers, re-added as their own contacts.
    pub internal: Vec<AttributeRow>,
}

impl PreservedAttributes {
    pub fn extract(prior: &Phonebook, cleanup: impl Fn(&str) -> String) -> Self {
        Self::from_snapshot(&AttributeSnapshot::from_phonebook(prior, cleanup))
    }

    pub fn from_snapshot(snapshot: &AttributeSnapshot) -> Self {
        let mut preserved = Self::default();
        for row in &snapshot.rows {
            if row.quickdial.is_some() || row.vanity.is_some() {
                preserved.attributes.insert(
                    composite_key(&row.number, &row.uid),
                    PreservedAttribute {
                        quickdial: row.quickdial.clone(),
                        vanity: row.vanity.clone(),
                    },
                );
            }
            if row.is_internal() {
                preserved.internal.push(row.clone());
            }
        }
        preserved
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.internal.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The phonebook already carried quick-dial or vanity values from the
    /// source and was left alone.
    SkippedManual,
    Merged {
        restored: usize,
        internal_added: usize,
    },
}

/// True when any number already has a quick-dial or vanity value.
pub fn has_manual_attributes(phonebook: &Phonebook) -> bool {
    phonebook
        .numbers()
        .any(|(_, number)| number.quickdial.is_some() || number.vanity.is_some())
}

/// Copies preserved quick-dial and vanity values onto matching numbers and
/// appends one contact per uid of internal numbers.
pub fn reconcile(phonebook: &mut Phonebook, preserved: &PreservedAttributes) -> ReconcileOutcome {
    if has_manual_attributes(phonebook) {
        return ReconcileOutcome::SkippedManual;
    }
    if preserved.is_empty() {
        return ReconcileOutcome::Merged {
            restored: 0,
            internal_added: 0,
        };
    }

    let mut restored = 0;
    let mut present = BTreeSet::new();
    for contact in &mut phonebook.contacts {
        let Some(uid) = contact.external_id.as_deref() else {
            continue;
        };
        for number in &mut contact.numbers {
            let key = composite_key(&number.number, uid);
            if let Some(attribute) = preserved.attributes.get(&key) {
                if attribute.quickdial.is_some() {
                    number.quickdial = attribute.quickdial.clone();
                }
                if attribute.vanity.is_some() {
                    number.vanity = attribute.vanity.clone();
                }
                restored += 1;
            }
            present.insert(key);
        }
    }

    let mut internal_by_uid: BTreeMap<&str, Vec<&AttributeRow>> = BTreeMap::new();
    let mut order = Vec::new();
    for row in &preserved.internal {
        if present.contains(&composite_key(&row.number, &row.uid)) {
            continue;
        }
        let rows = internal_by_uid.entry(row.uid.as_str()).or_default();
        if rows.is_empty() {
            order.push(row.uid.as_str());
        }
        rows.push(row);
    }

    let mut internal_added = 0;
    for uid in order {
        let Some(rows) = internal_by_uid.get(uid) else {
            continue;
        };
        phonebook.contacts.push(internal_contact(uid, rows));
        internal_added += 1;
    }

    ReconcileOutcome::Merged {
        restored,
        internal_added,
    }
}

fn internal_contact(uid: &str, rows: &[&AttributeRow]) -> DeviceContact {
    DeviceContact {
        external_id: Some(uid.to_string()),
        name: rows
            .iter()
            .map(|row| row.name.as_str())
            .find(|name| !name.is_empty())
            .unwrap_or_default()
            .to_string(),
        numbers: rows.iter().map(|row| row.to_number()).collect(),
        ..DeviceContact::default()
    }
}
