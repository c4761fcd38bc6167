use crate::{Result, SyncError};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Text the device answers with after a successful phonebook import.
pub const RESTORE_CONFIRMATION: &str = "Das Telefonbuch der FRITZ!Box wurde wiederhergestellt";

const EMPTY_SID: &str = "0000000000000000";

pub trait DeviceTransport {
    /// The stored phonebook, or `None` when the device answered with
    /// something other than an XML export.
    fn download_phonebook(&self, id: u32, name: &str) -> Result<Option<String>>;
    fn upload_phonebook(&self, id: u32, xml: &str) -> Result<()>;
}

/// Accepts an export body only when it is an XML document.
pub fn exported_xml(body: String) -> Option<String> {
    if body.starts_with("<?xml") {
        Some(body)
    } else {
        None
    }
}

pub fn check_upload_response(body: &str) -> Result<()> {
    if body.contains(RESTORE_CONFIRMATION) {
        Ok(())
    } else {
        Err(SyncError::UploadRejected(
            "restore confirmation missing from device response".to_string(),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub sid: String,
    pub challenge: String,
    pub block_time: u64,
}

impl SessionInfo {
    pub fn is_authenticated(&self) -> bool {
        !self.sid.is_empty() && self.sid != EMPTY_SID
    }
}

/// Parses the `SessionInfo` document served by `login_sid.lua`.
pub fn parse_session_info(xml: &str) -> Result<SessionInfo> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut info = SessionInfo::default();
    let mut current: Option<Vec<u8>> = None;
    let mut seen_root = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref event)) => {
                let name = event.local_name().as_ref().to_vec();
                if name == b"SessionInfo" {
                    seen_root = true;
                }
                current = Some(name);
            }
            Ok(Event::Text(ref event)) => {
                let text = event
                    .unescape()
                    .map_err(|err| SyncError::Parse(err.to_string()))?;
                match current.as_deref() {
                    Some(b"SID") => info.sid = text.trim().to_string(),
                    Some(b"Challenge") => info.challenge = text.trim().to_string(),
                    Some(b"BlockTime") => info.block_time = text.trim().parse().unwrap_or(0),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(SyncError::Parse(err.to_string())),
        }
        buf.clear();
    }

    if !seen_root {
        return Err(SyncError::Login("no SessionInfo in login response".to_string()));
    }
    Ok(info)
}

#[cfg(feature = "box-sync")]
mod imp {
    use super::{
        check_upload_response, exported_xml, parse_session_info, DeviceTransport, Result,
        SessionInfo, SyncError,
    };
    use pbkdf2::pbkdf2_hmac;
    use reqwest::blocking::multipart::{Form, Part};
    use reqwest::blocking::Client;
    use sha2::Sha256;
    use std::time::Duration;
    use url::Url;

    /// FRITZ!OS session over `login_sid.lua` and `cgi-bin/firmwarecfg`.
    #[derive(Debug)]
    pub struct FritzBoxClient {
        base: Url,
        client: Client,
        sid: String,
    }

    impl FritzBoxClient {
        pub fn login(url: &str, username: &str, password: &str) -> Result<Self> {
            let base = Url::parse(url)?;
            let client = Client::builder()
                .user_agent("fbsync")
                .timeout(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(10))
                .build()?;
            let login_url = base.join("login_sid.lua?version=2")?;

            let body = client.get(login_url.clone()).send()?.error_for_status()?.text()?;
            let info = parse_session_info(&body)?;
            if info.is_authenticated() {
                return Ok(Self {
                    base,
                    client,
                    sid: info.sid,
                });
            }

            let response = challenge_response(&info.challenge, password)?;
            let body = client
                .post(login_url)
                .form(&[("username", username), ("response", response.as_str())])
                .send()?
                .error_for_status()?
                .text()?;
            let info: SessionInfo = parse_session_info(&body)?;
            if !info.is_authenticated() {
                return Err(SyncError::Login(format!(
                    "credentials rejected for user `{username}` (blocked for {}s)",
                    info.block_time
                )));
            }
            Ok(Self {
                base,
                client,
                sid: info.sid,
            })
        }

        fn firmwarecfg(&self, form: Form) -> Result<String> {
            let url = self.base.join("cgi-bin/firmwarecfg")?;
            Ok(self
                .client
                .post(url)
                .multipart(form)
                .send()?
                .error_for_status()?
                .text()?)
        }
    }

    impl DeviceTransport for FritzBoxClient {
        fn download_phonebook(&self, id: u32, name: &str) -> Result<Option<String>> {
            let form = Form::new()
                .text("sid", self.sid.clone())
                .text("PhonebookId", id.to_string())
                .text("PhonebookExportName", name.to_string())
                .text("PhonebookExport", "");
            Ok(exported_xml(self.firmwarecfg(form)?))
        }

        fn upload_phonebook(&self, id: u32, xml: &str) -> Result<()> {
            let file = Part::bytes(xml.as_bytes().to_vec())
                .file_name("updatepb.xml")
                .mime_str("text/xml")?;
            let form = Form::new()
                .text("sid", self.sid.clone())
                .text("PhonebookId", id.to_string())
                .part("PhonebookImportFile", file);
            check_upload_response(&self.firmwarecfg(form)?)
        }
    }

    /// Answers a `2$<iter1>$<salt1>$<iter2>$<salt2>` challenge.
    pub fn challenge_response(challenge: &str, password: &str) -> Result<String> {
        let parts: Vec<&str> = challenge.split('$').collect();
        let [version, iter1, salt1, iter2, salt2] = parts.as_slice() else {
            return Err(SyncError::Login(
                "device only offers the legacy MD5 login, which is not supported".to_string(),
            ));
        };
        if *version != "2" {
            return Err(SyncError::Login(format!(
                "unsupported login challenge version `{version}`"
            )));
        }
        let iter1 = parse_iterations(iter1)?;
        let iter2 = parse_iterations(iter2)?;
        let salt1 = decode_salt(salt1)?;
        let salt2_bytes = decode_salt(salt2)?;

        let mut hash1 = [0u8; 32];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt1, iter1, &mut hash1);
        let mut hash2 = [0u8; 32];
        pbkdf2_hmac::<Sha256>(&hash1, &salt2_bytes, iter2, &mut hash2);
        Ok(format!("{salt2}${}", hex::encode(hash2)))
    }

    fn parse_iterations(value: &str) -> Result<u32> {
        value
            .parse()
            .map_err(|_| SyncError::Login(format!("invalid iteration count `{value}`")))
    }

    fn decode_salt(value: &str) -> Result<Vec<u8>> {
        hex::decode(value).map_err(|err| SyncError::Login(format!("invalid salt `{value}`: {err}")))
    }

}

#[cfg(not(feature = "box-sync"))]
mod imp {
    use super::{DeviceTransport, Result, SyncError};

    const UNAVAILABLE: &str = "device access requires the box-sync feature";

    #[derive(Debug)]
    pub struct FritzBoxClient {
        _private: (),
    }

    impl FritzBoxClient {
        pub fn login(_url: &str, _username: &str, _password: &str) -> Result<Self> {
            Err(SyncError::Unavailable(UNAVAILABLE.to_string()))
        }
    }

    impl DeviceTransport for FritzBoxClient {
        fn download_phonebook(&self, _id: u32, _name: &str) -> Result<Option<String>> {
            Err(SyncError::Unavailable(UNAVAILABLE.to_string()))
        }

        fn upload_phonebook(&self, _id: u32, _xml: &str) -> Result<()> {
            Err(SyncError::Unavailable(UNAVAILABLE.to_string()))
        }
    }
}

pub use imp::FritzBoxClient;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_info_parsing() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?><SessionInfo><SID>0000000000000000</SID><Challenge>2$60000$aa$6000$bb</Challenge><BlockTime>5</BlockTime><Rights></Rights></SessionInfo>"#;
        let info = parse_session_info(xml).expect("parse");
        assert_eq!(info.challenge, "2$60000$aa$6000$bb");
        assert_eq!(info.block_time, 5);
        assert!(!info.is_authenticated());

        let xml = "<SessionInfo><SID>ab12cd34ef567890</SID></SessionInfo>";
        assert!(parse_session_info(xml).expect("parse").is_authenticated());
        assert!(parse_session_info("<html/>").is_err());
    }

    #[test]
    fn export_must_be_xml() {
        assert!(exported_xml("<?xml version=\"1.0\"?><phonebooks/>".to_string()).is_some());
        assert!(exported_xml("<html>session expired</html>".to_string()).is_none());
    }

    #[test]
    fn upload_needs_confirmation() {
        let ok = format!("<html><p>{RESTORE_CONFIRMATION}.</p></html>");
        assert!(check_upload_response(&ok).is_ok());
        assert!(matches!(
            check_upload_response("<html>Fehler</html>"),
            Err(SyncError::UploadRejected(_))
        ));
    }
}
