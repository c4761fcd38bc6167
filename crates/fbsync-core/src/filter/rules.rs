use crate::domain::CanonicalContact;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagAttribute {
    Categories,
    Groups,
}

impl TagAttribute {
    pub fn as_str(self) -> &'static str {
        match self {
            TagAttribute::Categories => "categories",
            TagAttribute::Groups => "groups",
        }
    }

    fn tags(self, contact: &CanonicalContact) -> &BTreeSet<String> {
        match self {
            TagAttribute::Categories => &contact.categories,
            TagAttribute::Groups => &contact.groups,
        }
    }
}

/// Allow-lists per tag attribute. Shared by the include/exclude filters and
/// the VIP classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRules(BTreeMap<TagAttribute, Vec<String>>);

impl TagRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S>(mut self, attribute: TagAttribute, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(attribute, values);
        self
    }

    pub fn insert<I, S>(&mut self, attribute: TagAttribute, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(attribute)
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    pub fn values(&self, attribute: TagAttribute) -> &[String] {
        self.0.get(&attribute).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_values(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_values() == 0
    }

    /// True when any attribute's tag set intersects its allow-list.
    pub fn matches(&self, contact: &CanonicalContact) -> bool {
        self.0.iter().any(|(attribute, allowed)| {
            let tags = attribute.tags(contact);
            allowed.iter().any(|value| tags.contains(value))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRules {
    pub include: TagRules,
    pub exclude: TagRules,
}
