use crate::domain::contact::joined_types;
use crate::domain::is_device_internal;
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Matched case-insensitively as a substring of the joined type tags.
    pub pattern: String,
    pub value: String,
}

impl TypeMapping {
    pub fn new(pattern: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl Replacement {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

const MAX_CLEANUP_PASSES: usize = 8;

/// Rejects replacements whose output contains their own input, since
/// those never reach a fixpoint.
pub(crate) fn check_replacements(replacements: &[Replacement]) -> Result<(), CoreError> {
    match replacements
        .iter()
        .find(|replacement| !replacement.from.is_empty() && replacement.to.contains(&replacement.from))
    {
        Some(replacement) => Err(CoreError::GrowingReplacement {
            from: replacement.from.clone(),
            to: replacement.to.clone(),
        }),
        None => Ok(()),
    }
}

/// Applies the replacement table until the value stops changing. SIP
/// addresses and `**` numbers are returned untouched.
pub(crate) fn cleanup_number(raw: &str, replacements: &[Replacement]) -> String {
    if looks_like_address(raw) || is_device_internal(raw) {
        return raw.to_string();
    }

    let mut current = raw.to_string();
    for _ in 0..MAX_CLEANUP_PASSES {
        let next = cleanup_pass(&current, replacements);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn cleanup_pass(value: &str, replacements: &[Replacement]) -> String {
    let mut out = value.replace('\u{a0}', " ");
    for replacement in replacements {
        if replacement.from.is_empty() {
            continue;
        }
        out = out.replace(&replacement.from, &replacement.to);
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn looks_like_address(value: &str) -> bool {
    let value = value.trim();
    let value = value.strip_prefix("sip:").unwrap_or(value);
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// First mapping whose pattern occurs in the tags, lower-cased.
pub(crate) fn classify(types: &[String], mappings: &[TypeMapping]) -> Option<String> {
    let joined = joined_types(types);
    mappings
        .iter()
        .filter(|mapping| !mapping.pattern.is_empty())
        .find(|mapping| joined.contains(&mapping.pattern.to_ascii_uppercase()))
        .map(|mapping| mapping.value.to_lowercase())
}

pub(crate) fn classify_phone(types: &[String], mappings: &[TypeMapping], fax_type: &str) -> String {
    if joined_types(types).contains("FAX") {
        return fax_type.to_lowercase();
    }
    classify(types, mappings).unwrap_or_else(|| "other".to_string())
}

/// Distinct mapped values in first-seen order, then `other`.
pub(crate) fn sort_order(mappings: &[TypeMapping]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    for value in mappings.iter().map(|mapping| mapping.value.to_lowercase()) {
        if !order.contains(&value) {
            order.push(value);
        }
    }
    if !order.iter().any(|value| value == "other") {
        order.push("other".to_string());
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacements() -> Vec<Replacement> {
        vec![
            Replacement::new("+49", ""),
            Replacement::new("(", ""),
            Replacement::new(")", ""),
            Replacement::new("/", ""),
            Replacement::new("-", ""),
        ]
    }

    fn mappings() -> Vec<TypeMapping> {
        vec![
            TypeMapping::new("WORK", "work"),
            TypeMapping::new("HOME", "home"),
            TypeMapping::new("CELL", "mobile"),
            TypeMapping::new("FAX", "fax_work"),
        ]
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn cleanup_applies_table_and_collapses_whitespace() {
        let cleaned = cleanup_number("+49 (911)\u{a0}123-45 / 6", &replacements());
        assert_eq!(cleaned, "911 12345 6");
    }

    #[test]
    fn cleanup_is_idempotent() {
        let table = vec![Replacement::new("--", "-"), Replacement::new("0 ", "0")];
        for raw in ["0911 ---- 1", "  +49 (0) 30 / 1234 ", "a--b", "**610", "x@y.de"] {
            let once = cleanup_number(raw, &table);
            assert_eq!(cleanup_number(&once, &table), once, "input {raw:?}");
            let once = cleanup_number(raw, &replacements());
            assert_eq!(cleanup_number(&once, &replacements()), once, "input {raw:?}");
        }
    }

    #[test]
    fn growing_replacements_are_rejected() {
        let err = check_replacements(&[Replacement::new("-", ""), Replacement::new("0", "00")])
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::GrowingReplacement {
                from: "0".to_string(),
                to: "00".to_string(),
            }
        );
        assert!(check_replacements(&[Replacement::new("", "x"), Replacement::new("00", "0")]).is_ok());
    }

    #[test]
    fn cleanup_skips_sip_and_internal_numbers() {
        assert_eq!(cleanup_number("alice@sip.example.com", &replacements()), "alice@sip.example.com");
        assert_eq!(cleanup_number("**9 (1)", &replacements()), "**9 (1)");
    }

    #[test]
    fn first_matching_mapping_wins() {
        assert_eq!(classify_phone(&tags(&["cell", "work"]), &mappings(), "fax_work"), "work");
        assert_eq!(classify_phone(&tags(&["HOME"]), &mappings(), "fax_work"), "home");
        assert_eq!(classify_phone(&tags(&["voice"]), &mappings(), "fax_work"), "other");
    }

    #[test]
    fn fax_overrides_mapping_order() {
        assert_eq!(
            classify_phone(&tags(&["HOME", "FAX"]), &mappings(), "fax_work"),
            "fax_work"
        );
        let no_fax_mapping = vec![TypeMapping::new("WORK", "work")];
        assert_eq!(
            classify_phone(&tags(&["work", "fax"]), &no_fax_mapping, "fax_work"),
            "fax_work"
        );
    }

    #[test]
    fn sort_order_dedups_and_appends_other() {
        let mut mappings = mappings();
        mappings.push(TypeMapping::new("MAIN", "Work"));
        assert_eq!(sort_order(&mappings), vec!["work", "home", "mobile", "fax_work", "other"]);
        let with_other = vec![TypeMapping::new("VOICE", "other"), TypeMapping::new("CELL", "mobile")];
        assert_eq!(sort_order(&with_other), vec!["other", "mobile"]);
    }
}
