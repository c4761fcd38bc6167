use crate::normalize::{LinkedData, LinkedDataFetcher};
use crate::source::VcfSource;
use crate::{Result, SyncError};

#[cfg(feature = "dav-sync")]
mod imp {
    use super::{LinkedData, LinkedDataFetcher, Result, SyncError, VcfSource};
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use reqwest::blocking::Client;
    use reqwest::header::CONTENT_TYPE;
    use reqwest::{Method, StatusCode};
    use std::time::Duration;
    use url::Url;

    const REPORT_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<card:addressbook-query xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:prop>
    <d:getetag/>
    <card:address-data/>
  </d:prop>
</card:addressbook-query>
"#;

    const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:getlastmodified/>
  </d:prop>
</d:propfind>
"#;

    #[derive(Debug, Clone)]
    pub struct CardDavSource {
        addressbook_url: String,
        username: String,
        password: String,
        user_agent: Option<String>,
    }

    impl CardDavSource {
        pub fn new(
            addressbook_url: String,
            username: String,
            password: String,
            user_agent: Option<String>,
        ) -> Self {
            Self {
                addressbook_url,
                username,
                password,
                user_agent,
            }
        }

        pub fn url(&self) -> &str {
            &self.addressbook_url
        }

        /// Newest `getlastmodified` of the address book members, as a unix
        /// timestamp.
        pub fn latest_modification(&self) -> Result<Option<i64>> {
            let url = https_url(&self.addressbook_url)?;
            let client = build_client(self.user_agent.as_deref())?;
            let propfind = Method::from_bytes(b"PROPFIND")
                .map_err(|_| SyncError::Parse("invalid PROPFIND method".to_string()))?;
            let body = client
                .request(propfind, url)
                .basic_auth(&self.username, Some(&self.password))
                .header("Depth", "1")
                .header("Content-Type", "application/xml; charset=utf-8")
                .body(PROPFIND_BODY)
                .send()?
                .error_for_status()?
                .text()?;
            latest_modification(&body)
        }
    }

    impl VcfSource for CardDavSource {
        fn source_name(&self) -> &'static str {
            "carddav"
        }

        fn fetch_vcf(&self) -> Result<String> {
            fetch_vcards(
                &self.addressbook_url,
                &self.username,
                &self.password,
                self.user_agent.as_deref(),
            )
        }
    }

    /// Resolves PHOTO/LOGO/SOUND/KEY links with the account's credentials.
    impl LinkedDataFetcher for CardDavSource {
        fn fetch_linked(&self, uri: &str) -> Result<Option<LinkedData>> {
            let base = Url::parse(&self.addressbook_url)?;
            let url = base.join(uri)?;
            let client = build_client(self.user_agent.as_deref())?;
            let response = client
                .get(url)
                .basic_auth(&self.username, Some(&self.password))
                .send()?;
            if !response.status().is_success() {
                return Ok(None);
            }
            let mime_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = response.bytes()?.to_vec();
            if data.is_empty() {
                return Ok(None);
            }
            Ok(Some(LinkedData { mime_type, data }))
        }
    }

    pub fn fetch_vcards(
        addressbook_url: &str,
        username: &str,
        password: &str,
        user_agent: Option<&str>,
    ) -> Result<String> {
        let url = https_url(addressbook_url)?;
        let client = build_client(user_agent)?;
        let report_method = Method::from_bytes(b"REPORT")
            .map_err(|_| SyncError::Parse("invalid REPORT method".to_string()))?;

        let response = client
            .request(report_method, url)
            .basic_auth(username, Some(password))
            .header("Depth", "1")
            .header("Content-Type", "application/xml; charset=utf-8")
            .header("Accept", "application/xml")
            .body(REPORT_BODY)
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(String::new());
        }

        let body = response.error_for_status()?.text()?;
        let cards = parse_address_data(&body)?;
        Ok(join_vcards(cards))
    }

    fn https_url(raw: &str) -> Result<Url> {
        let url = Url::parse(raw)?;
        if url.scheme() != "https" {
            return Err(SyncError::Parse("carddav url must use https".to_string()));
        }
        Ok(url)
    }

    fn build_client(user_agent: Option<&str>) -> Result<Client> {
        Ok(Client::builder()
            .user_agent(user_agent.unwrap_or("fbsync"))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?)
    }

    fn join_vcards(cards: Vec<String>) -> String {
        let mut out = String::new();
        for card in cards {
            let trimmed = card.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            out.push_str(trimmed);
            out.push('\n');
        }
        out
    }

    fn parse_address_data(body: &str) -> Result<Vec<String>> {
        let mut cards = Vec::new();
        for text in element_texts(body, b"address-data")? {
            let normalized = normalize_vcard_indentation(&text);
            if !normalized.trim().is_empty() {
                cards.push(normalized);
            }
        }
        Ok(cards)
    }

    fn latest_modification(body: &str) -> Result<Option<i64>> {
        Ok(element_texts(body, b"getlastmodified")?
            .iter()
            .filter_map(|value| chrono::DateTime::parse_from_rfc2822(value.trim()).ok())
            .map(|value| value.timestamp())
            .max())
    }

    /// Text content of every element with the given local name.
    fn element_texts(body: &str, local_name: &[u8]) -> Result<Vec<String>> {
        let mut reader = Reader::from_str(body);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut values = Vec::new();
        let mut current = String::new();
        let mut inside = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref event))
                    if event.local_name().as_ref().eq_ignore_ascii_case(local_name) =>
                {
                    inside = true;
                    current.clear();
                }
                Ok(Event::End(ref event))
                    if event.local_name().as_ref().eq_ignore_ascii_case(local_name) =>
                {
                    inside = false;
                    if !current.trim().is_empty() {
                        values.push(std::mem::take(&mut current));
                    }
                    current.clear();
                }
                Ok(Event::Text(event)) if inside => {
                    let text = event
                        .unescape()
                        .map_err(|err| SyncError::Parse(err.to_string()))?;
                    current.push_str(&text);
                }
                Ok(Event::CData(event)) if inside => {
                    let raw = event.into_inner();
                    let text = String::from_utf8_lossy(&raw);
                    current.push_str(&text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(SyncError::Parse(err.to_string())),
            }
            buf.clear();
        }

        Ok(values)
    }

    /// Servers pretty-print address-data; strip the indentation they add
    /// without touching folded continuation lines.
    fn normalize_vcard_indentation(raw: &str) -> String {
        let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
        let mut lines: Vec<&str> = normalized.lines().collect();
        while matches!(lines.first(), Some(line) if line.trim().is_empty()) {
            lines.remove(0);
        }
        while matches!(lines.last(), Some(line) if line.trim().is_empty()) {
            lines.pop();
        }

        let indent = common_indent(&lines);
        lines
            .iter()
            .map(|line| strip_indent(line, indent))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn common_indent(lines: &[&str]) -> usize {
        lines
            .iter()
            .filter(|line| {
                let upper = line.trim().to_ascii_uppercase();
                !upper.is_empty()
                    && !upper.starts_with("BEGIN:VCARD")
                    && !upper.starts_with("END:VCARD")
            })
            .map(|line| {
                line.chars()
                    .take_while(|ch| *ch == ' ' || *ch == '\t')
                    .count()
            })
            .min()
            .unwrap_or(0)
    }

    fn strip_indent(line: &str, indent: usize) -> String {
        let upper = line.trim().to_ascii_uppercase();
        if upper.starts_with("BEGIN:VCARD") || upper.starts_with("END:VCARD") {
            return line.trim().to_string();
        }
        let mut start = line.len();
        let mut removed = 0;
        for (idx, ch) in line.char_indices() {
            if removed < indent && (ch == ' ' || ch == '\t') {
                removed += 1;
                continue;
            }
            start = idx;
            break;
        }
        line[start..].to_string()
    }

}

#[cfg(not(feature = "dav-sync"))]
mod imp {
    use super::{LinkedData, LinkedDataFetcher, Result, SyncError, VcfSource};

    const UNAVAILABLE: &str = "CardDAV access requires the dav-sync feature";

    #[derive(Debug, Clone)]
    pub struct CardDavSource {
        addressbook_url: String,
        username: String,
        password: String,
        user_agent: Option<String>,
    }

    impl CardDavSource {
        pub fn new(
            addressbook_url: String,
            username: String,
            password: String,
            user_agent: Option<String>,
        ) -> Self {
            Self {
                addressbook_url,
                username,
                password,
                user_agent,
            }
        }

        pub fn url(&self) -> &str {
            &self.addressbook_url
        }

        pub fn latest_modification(&self) -> Result<Option<i64>> {
            Err(SyncError::Unavailable(UNAVAILABLE.to_string()))
        }
    }

    impl VcfSource for CardDavSource {
        fn source_name(&self) -> &'static str {
            "carddav"
        }

        fn fetch_vcf(&self) -> Result<String> {
            let _ = (&self.username, &self.password, &self.user_agent);
            Err(SyncError::Unavailable(UNAVAILABLE.to_string()))
        }
    }

    impl LinkedDataFetcher for CardDavSource {
        fn fetch_linked(&self, _uri: &str) -> Result<Option<LinkedData>> {
            Err(SyncError::Unavailable(UNAVAILABLE.to_string()))
        }
    }

    pub fn fetch_vcards(
        _addressbook_url: &str,
        _username: &str,
        _password: &str,
        _user_agent: Option<&str>,
    ) -> Result<String> {
        Err(SyncError::Unavailable(UNAVAILABLE.to_string()))
    }
}

pub use imp::{fetch_vcards, CardDavSource};
