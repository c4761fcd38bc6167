use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fbsync_core::fax::split_name;
use fbsync_core::DeviceContact;

/// One content line of a card, after unfolding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfProperty {
    pub name: String,
    pub params: Vec<(String, String)>,
    /// Raw value, still escaped.
    pub value: String,
}

impl VcfProperty {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// TYPE parameters, including bare vCard 2.1 style ones (`TEL;HOME:`).
    pub fn types(&self) -> Vec<String> {
        let mut types = Vec::new();
        for (key, value) in &self.params {
            if key.eq_ignore_ascii_case("TYPE") {
                types.extend(
                    value
                        .split(',')
                        .map(|item| item.trim().trim_matches('"'))
                        .filter(|item| !item.is_empty())
                        .map(str::to_string),
                );
            } else if value.is_empty() {
                types.push(key.clone());
            }
        }
        types
    }

    pub fn text(&self) -> String {
        unescape_vcard_value(&self.value)
    }

    /// Comma separated values such as CATEGORIES, each unescaped.
    pub fn list(&self) -> Vec<String> {
        split_escaped(&self.value, ',')
            .iter()
            .map(|item| unescape_vcard_value(item).trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }

    /// Semicolon separated components such as N or ORG, each unescaped.
    pub fn components(&self) -> Vec<String> {
        split_escaped(&self.value, ';')
            .iter()
            .map(|item| unescape_vcard_value(item))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCard {
    pub properties: Vec<VcfProperty>,
    /// The card as received, unfolded, CRLF terminated.
    pub source: String,
}

impl RawCard {
    pub fn first(&self, name: &str) -> Option<&VcfProperty> {
        self.properties
            .iter()
            .find(|property| property.name.eq_ignore_ascii_case(name))
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.first(name)
            .map(VcfProperty::text)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedVcf {
    pub cards: Vec<RawCard>,
    pub warnings: Vec<String>,
}

pub fn parse_vcf(data: &str) -> ParsedVcf {
    parse_vcf_with_progress(data, &mut || {})
}

/// Splits a stream into cards. `progress` runs once per completed card.
/// Malformed lines and unbalanced BEGIN/END markers become warnings, so
/// parsing itself cannot fail.
pub fn parse_vcf_with_progress(data: &str, progress: &mut dyn FnMut()) -> ParsedVcf {
    let mut warnings = Vec::new();
    let mut cards = Vec::new();

    let mut current: Option<RawCard> = None;
    for line in unfold_lines(data) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("BEGIN:VCARD") {
            if current.is_some() {
                warnings.push("nested BEGIN:VCARD encountered".to_string());
            }
            current = Some(RawCard {
                properties: Vec::new(),
                source: "BEGIN:VCARD\r\n".to_string(),
            });
            continue;
        }

        if trimmed.eq_ignore_ascii_case("END:VCARD") {
            if let Some(mut card) = current.take() {
                card.source.push_str("END:VCARD\r\n");
                cards.push(card);
                progress();
            } else {
                warnings.push("END:VCARD without matching BEGIN:VCARD".to_string());
            }
            continue;
        }

        let Some(card) = current.as_mut() else {
            continue;
        };
        card.source.push_str(trimmed);
        card.source.push_str("\r\n");

        match split_property(trimmed) {
            Some(property) => card.properties.push(property),
            None => warnings.push(format!("unparsable line: {trimmed}")),
        }
    }

    if let Some(mut card) = current.take() {
        warnings.push("missing END:VCARD at end of file".to_string());
        card.source.push_str("END:VCARD\r\n");
        cards.push(card);
        progress();
    }

    ParsedVcf { cards, warnings }
}

/// The card's source text with every PHOTO line replaced by one inline
/// base64 photo, folded at 75 octets.
pub fn with_inline_photo(card: &RawCard, subtype: &str, data: &[u8]) -> String {
    let photo = format!(
        "PHOTO;ENCODING=b;TYPE={}:{}",
        subtype.to_ascii_uppercase(),
        STANDARD.encode(data)
    );
    let mut out = String::with_capacity(card.source.len() + photo.len());
    for line in card.source.split("\r\n").filter(|line| !line.is_empty()) {
        if line.eq_ignore_ascii_case("END:VCARD") {
            out.push_str(&fold_line(&photo));
        }
        let is_photo = split_property(line).is_some_and(|property| property.name == "PHOTO");
        if !is_photo {
            out.push_str(line);
            out.push_str("\r\n");
        }
    }
    out
}

fn fold_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + line.len() / 74 * 3 + 2);
    let mut width = 0;
    for ch in line.chars() {
        if width + ch.len_utf8() > 75 {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += ch.len_utf8();
    }
    out.push_str("\r\n");
    out
}

const VIP_NOTE: &str =
    "This contact was marked as important.\nSuggestion: assign to a VIP category or group.";

/// vCard 3.0 rendering of a phonebook entry. A name of the form
/// `last<separator>first` becomes N, anything else ORG.
pub fn device_contact_vcard(contact: &DeviceContact, separator: &str) -> String {
    let mut out = String::new();
    out.push_str("BEGIN:VCARD\r\n");
    out.push_str("VERSION:3.0\r\n");
    match split_name(&contact.name, separator) {
        Some((last, first)) => {
            out.push_str(&format!(
                "N:{};{};;;\r\n",
                escape_vcard_value(last),
                escape_vcard_value(first)
            ));
            out.push_str(&format!(
                "FN:{}\r\n",
                escape_vcard_value(&format!("{first} {last}"))
            ));
        }
        None => {
            out.push_str(&format!("N:{};;;;\r\n", escape_vcard_value(&contact.name)));
            out.push_str(&format!("FN:{}\r\n", escape_vcard_value(&contact.name)));
            out.push_str(&format!("ORG:{}\r\n", escape_vcard_value(&contact.name)));
        }
    }
    if let Some(uid) = contact.external_id.as_deref() {
        out.push_str(&format!("UID:{}\r\n", escape_vcard_value(uid)));
    }
    for number in &contact.numbers {
        out.push_str(&format!(
            "TEL;TYPE={}:{}\r\n",
            vcard_phone_type(&number.kind),
            escape_vcard_value(&number.number)
        ));
    }
    if let Some(email) = contact.emails.first() {
        out.push_str(&format!("EMAIL:{}\r\n", escape_vcard_value(&email.address)));
    }
    if contact.vip {
        out.push_str(&format!("NOTE:{}\r\n", escape_vcard_value(VIP_NOTE)));
    }
    out.push_str("END:VCARD\r\n");
    out
}

pub fn export_device_contacts(contacts: &[&DeviceContact], separator: &str) -> String {
    contacts
        .iter()
        .map(|contact| device_contact_vcard(contact, separator))
        .collect()
}

fn vcard_phone_type(kind: &str) -> String {
    match kind {
        "fax_work" => "FAX".to_string(),
        "mobile" => "CELL".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

fn unfold_lines(input: &str) -> Vec<String> {
    let input = normalize_line_endings(input);
    let mut lines: Vec<String> = Vec::new();
    for raw in input.lines() {
        let line = raw;
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = lines.last_mut() {
                last.push_str(&line[1..]);
            } else {
                lines.push(line[1..].to_string());
            }
        } else {
            lines.push(line.to_string());
        }
    }
    lines
}

fn normalize_line_endings(input: &str) -> std::borrow::Cow<'_, str> {
    if !input.contains('\r') {
        return std::borrow::Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if matches!(chars.peek(), Some('\n')) {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(ch);
        }
    }
    std::borrow::Cow::Owned(out)
}

/// `group.NAME;PARAM=a,b;BARE:value`. The value starts at the first colon
/// outside a quoted parameter.
fn split_property(line: &str) -> Option<VcfProperty> {
    let mut in_quotes = false;
    let mut split_at = None;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                split_at = Some(idx);
                break;
            }
            _ => {}
        }
    }
    let split_at = split_at?;
    let (left, value) = (&line[..split_at], &line[split_at + 1..]);

    let mut segments = split_params(left).into_iter();
    let mut name = segments.next()?.trim().to_string();
    if let Some((_, bare)) = name.rsplit_once('.') {
        name = bare.to_string();
    }
    if name.is_empty() {
        return None;
    }

    let params = segments
        .map(|segment| match segment.split_once('=') {
            Some((key, value)) => (
                key.trim().to_ascii_uppercase(),
                value.trim().trim_matches('"').to_string(),
            ),
            None => (segment.trim().to_ascii_uppercase(), String::new()),
        })
        .collect();

    Some(VcfProperty {
        name: name.to_ascii_uppercase(),
        params,
        value: value.to_string(),
    })
}

fn split_params(left: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in left.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ';' if !in_quotes => items.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    items.push(current);
    items
}

fn split_escaped(value: &str, separator: char) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in value.chars() {
        if escape {
            current.push(ch);
            escape = false;
            continue;
        }

        if ch == '\\' {
            current.push(ch);
            escape = true;
            continue;
        }

        if ch == separator {
            items.push(current);
            current = String::new();
        } else {
            current.push(ch);
        }
    }

    items.push(current);
    items
}

pub(crate) fn escape_vcard_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\n"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape_vcard_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') | Some('N') => out.push('\n'),
                Some('r') | Some('R') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some(';') => out.push(';'),
                Some(',') => out.push(','),
                Some(':') => out.push(':'),
                Some(other) => out.push(other),
                None => break,
            }
        } else {
            out.push(ch);
        }
    }
    out
}
