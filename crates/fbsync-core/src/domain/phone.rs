/// Strips everything except digits and a leading `+`.
pub fn normalize_number_key(value: &str) -> String {
    let trimmed = value.trim();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            out.push(ch);
        }
    }
    out
}

/// `{normalized-number}@{external-id}`
pub fn composite_key(number: &str, external_id: &str) -> String {
    format!("{}@{}", normalize_number_key(number), external_id)
}

/// Internal extensions and group calls (`**611`, `#9`) exist only on the
/// device and never come from a contact source.
pub fn is_internal_number(value: &str) -> bool {
    let trimmed = value.trim_start();
    trimmed.starts_with('*') || trimmed.starts_with('#')
}

/// Numbers with the device's own `**` prefix are never rewritten.
pub fn is_device_internal(value: &str) -> bool {
    value.trim_start().starts_with("**")
}

/// Numbers hosted by the device's own telephony service.
pub fn is_device_hosted(value: &str) -> bool {
    value.contains("@hd-telefonie.avm.de")
}
