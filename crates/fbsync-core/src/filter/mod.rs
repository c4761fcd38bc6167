mod rules;

use crate::domain::CanonicalContact;

pub use rules::{FilterRules, TagAttribute, TagRules};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub contacts: Vec<CanonicalContact>,
    /// The include list was empty and every contact was taken.
    pub include_fallback: bool,
    pub excluded: usize,
}

/// Include first, then exclude. An empty rule set is skipped.
pub fn apply_filters(contacts: Vec<CanonicalContact>, rules: &FilterRules) -> FilterOutcome {
    let total = contacts.len();
    let include_fallback = rules.include.is_empty();

    let included: Vec<CanonicalContact> = if include_fallback {
        contacts
    } else {
        contacts
            .into_iter()
            .filter(|contact| rules.include.matches(contact))
            .collect()
    };

    let kept: Vec<CanonicalContact> = if rules.exclude.is_empty() {
        included
    } else {
        included
            .into_iter()
            .filter(|contact| !rules.exclude.matches(contact))
            .collect()
    };

    FilterOutcome {
        excluded: total - kept.len(),
        contacts: kept,
        include_fallback,
    }
}
