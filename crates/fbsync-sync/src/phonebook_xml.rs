use crate::{Result, SyncError};
use fbsync_core::{DeviceContact, DeviceEmail, DeviceNumber, Phonebook};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Serializes `phonebook` into the device's import format.
pub fn write_phonebook(phonebook: &Phonebook) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    emit(&mut writer, Event::Start(BytesStart::new("phonebooks")))?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("phonebook").with_attributes([("name", phonebook.name.as_str())])),
    )?;
    if let Some(timestamp) = phonebook.timestamp {
        text_element(&mut writer, BytesStart::new("timestamp"), &timestamp.to_string())?;
    }
    for contact in &phonebook.contacts {
        write_contact(&mut writer, contact)?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("phonebook")))?;
    emit(&mut writer, Event::End(BytesEnd::new("phonebooks")))?;

    let mut xml = String::from_utf8(writer.into_inner())
        .map_err(|err| SyncError::Parse(err.to_string()))?;
    xml.push('\n');
    Ok(xml)
}

fn write_contact(writer: &mut Writer<Vec<u8>>, contact: &DeviceContact) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("contact")))?;
    if let Some(uid) = contact.external_id.as_deref() {
        text_element(writer, BytesStart::new("carddav_uid"), uid)?;
    }
    if contact.vip {
        text_element(writer, BytesStart::new("category"), "1")?;
    }

    emit(writer, Event::Start(BytesStart::new("telephony")))?;
    for number in &contact.numbers {
        let index = number.index.to_string();
        let mut element = BytesStart::new("number");
        element.push_attribute(("id", index.as_str()));
        if !number.kind.is_empty() {
            element.push_attribute(("type", number.kind.as_str()));
        }
        for (name, value) in [
            ("quickdial", &number.quickdial),
            ("vanity", &number.vanity),
            ("prio", &number.prio),
        ] {
            if let Some(value) = value.as_deref() {
                element.push_attribute((name, value));
            }
        }
        text_element(writer, element, &number.number)?;
    }
    emit(writer, Event::End(BytesEnd::new("telephony")))?;

    if !contact.emails.is_empty() {
        emit(writer, Event::Start(BytesStart::new("services")))?;
        for email in &contact.emails {
            let index = email.index.to_string();
            let mut element = BytesStart::new("email");
            element.push_attribute(("id", index.as_str()));
            if let Some(classifier) = email.classifier.as_deref() {
                element.push_attribute(("classifier", classifier));
            }
            text_element(writer, element, &email.address)?;
        }
        emit(writer, Event::End(BytesEnd::new("services")))?;
    }

    emit(writer, Event::Start(BytesStart::new("person")))?;
    text_element(writer, BytesStart::new("realName"), &contact.name)?;
    if let Some(url) = contact.image_url.as_deref() {
        text_element(writer, BytesStart::new("imageURL"), url)?;
    }
    emit(writer, Event::End(BytesEnd::new("person")))?;

    emit(writer, Event::End(BytesEnd::new("contact")))
}

fn text_element(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>, text: &str) -> Result<()> {
    let end = start.to_end().into_owned();
    emit(writer, Event::Start(start))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(end))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|err| SyncError::Parse(format!("xml write: {err}")))
}

/// Reads the first phonebook of a device export.
pub fn parse_phonebook(xml: &str) -> Result<Phonebook> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut phonebook = Phonebook::default();
    let mut seen_phonebook = false;
    let mut finished = false;
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut contact: Option<DeviceContact> = None;
    let mut number: Option<DeviceNumber> = None;
    let mut email: Option<DeviceEmail> = None;

    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| SyncError::Parse(format!("phonebook xml: {err}")))?;
        match event {
            Event::Start(ref start) if !finished => {
                let name = local_name(start);
                text.clear();
                match name.as_str() {
                    "phonebook" if !seen_phonebook => {
                        seen_phonebook = true;
                        read_phonebook_attributes(start, &mut phonebook)?;
                    }
                    "contact" if in_phonebook(&path) => contact = Some(DeviceContact::default()),
                    "number" if contact.is_some() => {
                        let count = contact.as_ref().map_or(0, |c| c.numbers.len());
                        number = Some(read_number(start, count)?);
                    }
                    "email" if contact.is_some() => {
                        let count = contact.as_ref().map_or(0, |c| c.emails.len());
                        email = Some(read_email(start, count)?);
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::Empty(ref start) if !finished => {
                if local_name(start) == "phonebook" && !seen_phonebook {
                    read_phonebook_attributes(start, &mut phonebook)?;
                    finished = true;
                }
            }
            Event::Text(ref value) if !finished => {
                let value = value
                    .unescape()
                    .map_err(|err| SyncError::Parse(format!("phonebook xml: {err}")))?;
                text.push_str(&value);
            }
            Event::CData(ref value) if !finished => {
                text.push_str(&String::from_utf8_lossy(value.as_ref()));
            }
            Event::End(_) if !finished => {
                let Some(name) = path.pop() else {
                    continue;
                };
                let value = std::mem::take(&mut text);
                let value = value.trim();
                match name.as_str() {
                    "phonebook" => finished = true,
                    "timestamp" if in_phonebook(&path) => {
                        phonebook.timestamp = value.parse().ok();
                    }
                    "contact" => {
                        if let Some(done) = contact.take() {
                            phonebook.contacts.push(done);
                        }
                    }
                    "carddav_uid" => {
                        if let Some(current) = contact.as_mut() {
                            current.external_id = Some(value.to_string()).filter(|v| !v.is_empty());
                        }
                    }
                    "category" => {
                        if let Some(current) = contact.as_mut() {
                            current.vip = value == "1";
                        }
                    }
                    "realName" => {
                        if let Some(current) = contact.as_mut() {
                            current.name = value.to_string();
                        }
                    }
                    "imageURL" => {
                        if let Some(current) = contact.as_mut() {
                            current.image_url = Some(value.to_string()).filter(|v| !v.is_empty());
                        }
                    }
                    "number" => {
                        if let (Some(current), Some(mut done)) = (contact.as_mut(), number.take()) {
                            done.number = value.to_string();
                            current.numbers.push(done);
                        }
                    }
                    "email" => {
                        if let (Some(current), Some(mut done)) = (contact.as_mut(), email.take()) {
                            done.address = value.to_string();
                            current.emails.push(done);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_phonebook {
        return Err(SyncError::Parse(
            "phonebook xml: no <phonebook> element".to_string(),
        ));
    }
    Ok(phonebook)
}

fn in_phonebook(path: &[String]) -> bool {
    path.last().is_some_and(|name| name == "phonebook")
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attribute in start.attributes() {
        let attribute =
            attribute.map_err(|err| SyncError::Parse(format!("phonebook xml: {err}")))?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| SyncError::Parse(format!("phonebook xml: {err}")))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn read_phonebook_attributes(start: &BytesStart<'_>, phonebook: &mut Phonebook) -> Result<()> {
    for (key, value) in attributes(start)? {
        match key.as_str() {
            "name" => phonebook.name = value,
            "timestamp" => phonebook.timestamp = value.trim().parse().ok(),
            _ => {}
        }
    }
    Ok(())
}

fn read_number(start: &BytesStart<'_>, position: usize) -> Result<DeviceNumber> {
    let mut number = DeviceNumber::new(position, "", "");
    for (key, value) in attributes(start)? {
        match key.as_str() {
            "id" => number.index = value.trim().parse().unwrap_or(position),
            "type" => number.kind = value,
            "quickdial" => number.quickdial = Some(value),
            "vanity" => number.vanity = Some(value),
            "prio" => number.prio = Some(value),
            _ => {}
        }
    }
    Ok(number)
}

fn read_email(start: &BytesStart<'_>, position: usize) -> Result<DeviceEmail> {
    let mut email = DeviceEmail {
        index: position,
        address: String::new(),
        classifier: None,
    };
    for (key, value) in attributes(start)? {
        match key.as_str() {
            "id" => email.index = value.trim().parse().unwrap_or(position),
            "classifier" => email.classifier = Some(value),
            _ => {}
        }
    }
    Ok(email)
}
