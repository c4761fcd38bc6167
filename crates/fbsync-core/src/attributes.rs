use crate::domain::{is_device_hosted, is_internal_number, DeviceNumber, Phonebook};
use crate::error::CoreError;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};

pub const CSV_HEADER: &str = "uid,number,id,type,quickdial,vanity,prio,name";
const COLUMNS: usize = 8;

/// One device number worth keeping: it carries a quick-dial code, a vanity
/// label, or is an internal extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeRow {
    pub uid: String,
    pub number: String,
    pub index: usize,
    pub kind: String,
    pub quickdial: Option<String>,
    pub vanity: Option<String>,
    pub prio: Option<String>,
    pub name: String,
}

impl AttributeRow {
    pub fn is_internal(&self) -> bool {
        is_internal_number(&self.number)
    }

    pub fn to_number(&self) -> DeviceNumber {
        DeviceNumber {
            index: self.index,
            number: self.number.clone(),
            kind: self.kind.clone(),
            quickdial: self.quickdial.clone(),
            vanity: self.vanity.clone(),
            prio: self.prio.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSnapshot {
    pub rows: Vec<AttributeRow>,
}

impl AttributeSnapshot {
    /// Collects the rows worth keeping from a device phonebook. Numbers are
    /// re-cleaned with `cleanup` so keys match the current conversion rules.
    /// Contacts without a uid get a fresh one.
    pub fn from_phonebook(phonebook: &Phonebook, cleanup: impl Fn(&str) -> String) -> Self {
        let mut rows = Vec::new();
        for contact in &phonebook.contacts {
            let mut uid = contact
                .external_id
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            for number in &contact.numbers {
                if is_device_hosted(&number.number) {
                    continue;
                }
                if !(number.has_quickdial()
                    || number.has_vanity()
                    || is_internal_number(&number.number))
                {
                    continue;
                }
                let uid = uid
                    .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
                    .clone();
                rows.push(AttributeRow {
                    uid,
                    number: cleanup(&number.number),
                    index: number.index,
                    kind: number.kind.clone(),
                    quickdial: non_empty(number.quickdial.as_deref()),
                    vanity: non_empty(number.vanity.as_deref()),
                    prio: non_empty(number.prio.as_deref()),
                    name: contact.name.clone(),
                });
            }
        }
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_csv(&self) -> Result<String, CoreError> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(CSV_HEADER.split(','))
            .map_err(csv_error)?;
        for row in &self.rows {
            let index = row.index.to_string();
            writer
                .write_record([
                    row.uid.as_str(),
                    row.number.as_str(),
                    index.as_str(),
                    row.kind.as_str(),
                    row.quickdial.as_deref().unwrap_or(""),
                    row.vanity.as_deref().unwrap_or(""),
                    row.prio.as_deref().unwrap_or(""),
                    row.name.as_str(),
                ])
                .map_err(csv_error)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| CoreError::Csv(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| CoreError::Csv(err.to_string()))
    }

    /// Parses a snapshot. The header must match exactly and every row must
    /// have the header's column count.
    pub fn from_csv(input: &str) -> Result<Self, CoreError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input.as_bytes());

        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record.map_err(csv_error)?,
            None => {
                return Err(CoreError::CsvHeaderMismatch {
                    expected: CSV_HEADER.to_string(),
                    found: String::new(),
                })
            }
        };
        let found = header.iter().map(str::trim).collect::<Vec<_>>().join(",");
        if found != CSV_HEADER {
            return Err(CoreError::CsvHeaderMismatch {
                expected: CSV_HEADER.to_string(),
                found,
            });
        }

        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(csv_error)?;
            if record.len() == 1 && record.get(0).is_some_and(|field| field.trim().is_empty()) {
                continue;
            }
            rows.push(parse_row(&record)?);
        }
        Ok(Self { rows })
    }
}

fn parse_row(record: &StringRecord) -> Result<AttributeRow, CoreError> {
    let line = record.position().map(|pos| pos.line()).unwrap_or_default();
    if record.len() != COLUMNS {
        return Err(CoreError::CsvColumnCount {
            line,
            expected: COLUMNS,
            found: record.len(),
        });
    }
    let field = |idx: usize| record.get(idx).unwrap_or("").to_string();
    let index_raw = field(2);
    let index = index_raw
        .trim()
        .parse::<usize>()
        .map_err(|_| CoreError::CsvField {
            line,
            column: "id",
            value: index_raw.clone(),
        })?;
    Ok(AttributeRow {
        uid: field(0),
        number: field(1),
        index,
        kind: field(3),
        quickdial: non_empty(record.get(4)),
        vanity: non_empty(record.get(5)),
        prio: non_empty(record.get(6)),
        name: field(7),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn csv_error(err: csv::Error) -> CoreError {
    CoreError::Csv(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceContact;

    fn row(uid: &str, number: &str, quickdial: Option<&str>, vanity: Option<&str>) -> AttributeRow {
        AttributeRow {
            uid: uid.to_string(),
            number: number.to_string(),
            index: 0,
            kind: "home".to_string(),
            quickdial: quickdial.map(str::to_string),
            vanity: vanity.map(str::to_string),
            prio: Some("1".to_string()),
            name: String::new(),
        }
    }

    fn sample() -> AttributeSnapshot {
        let mut internal = row("E2B70D3D", "**611", Some("99"), None);
        internal.name = "Gruppenruf".to_string();
        let mut quoted = row("ABC-E", "0152345678", None, Some("FOO"));
        quoted.name = "Mustermann, Marianne".to_string();
        AttributeSnapshot {
            rows: vec![row("ABC-D", "09131123456", Some("8"), None), internal, quoted],
        }
    }

    #[test]
    fn csv_round_trip() {
        let snapshot = sample();
        let csv = snapshot.to_csv().unwrap();
        assert!(csv.starts_with(CSV_HEADER));
        assert_eq!(AttributeSnapshot::from_csv(&csv).unwrap(), snapshot);
    }

    #[test]
    fn header_only_is_empty() {
        let csv = AttributeSnapshot::default().to_csv().unwrap();
        assert_eq!(csv.trim_end(), CSV_HEADER);
        assert!(AttributeSnapshot::from_csv(&csv).unwrap().is_empty());
    }

    #[test]
    fn parses_quoted_names() {
        let input = format!(
            "{CSV_HEADER}\nABC-D,09131123456,0,home,8,,1,\"\"\nE2B,**611,0,home,99,,1,Gruppenruf\n"
        );
        let snapshot = AttributeSnapshot::from_csv(&input).unwrap();
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].quickdial.as_deref(), Some("8"));
        assert_eq!(snapshot.rows[0].vanity, None);
        assert_eq!(snapshot.rows[1].name, "Gruppenruf");
        assert!(snapshot.rows[1].is_internal());
    }

    #[test]
    fn column_count_mismatch_is_an_error() {
        let input = format!("{CSV_HEADER}\nABC,0911,0,home,8\n");
        let err = AttributeSnapshot::from_csv(&input).unwrap_err();
        assert_eq!(
            err,
            CoreError::CsvColumnCount {
                line: 2,
                expected: 8,
                found: 5
            }
        );
    }

    #[test]
    fn wrong_header_is_an_error() {
        let err = AttributeSnapshot::from_csv("uid,number\n").unwrap_err();
        assert!(matches!(err, CoreError::CsvHeaderMismatch { .. }));
        assert!(AttributeSnapshot::from_csv("").is_err());
    }

    #[test]
    fn invalid_index_is_reported() {
        let input = format!("{CSV_HEADER}\nABC,0911,x,home,8,,,Name\n");
        assert!(matches!(
            AttributeSnapshot::from_csv(&input),
            Err(CoreError::CsvField { column: "id", .. })
        ));
    }

    #[test]
    fn snapshot_from_phonebook_keeps_marked_numbers() {
        let mut phonebook = Phonebook::new("Telefonbuch");
        let mut marked = DeviceNumber::new(0, "+49 9131 123456", "work");
        marked.quickdial = Some("11".to_string());
        marked.vanity = Some("AX".to_string());
        let mut negative = DeviceNumber::new(2, "0152", "mobile");
        negative.quickdial = Some("-1".to_string());
        let mut hosted = DeviceNumber::new(3, "**1@hd-telefonie.avm.de", "intern");
        hosted.quickdial = Some("5".to_string());
        phonebook.contacts.push(DeviceContact {
            external_id: Some("ABC".to_string()),
            name: "Mustermann, Max".to_string(),
            numbers: vec![marked, DeviceNumber::new(1, "0911 123456", "home"), negative, hosted],
            ..DeviceContact::default()
        });
        phonebook.contacts.push(DeviceContact {
            external_id: None,
            name: "Alle".to_string(),
            numbers: vec![DeviceNumber::new(0, "**9", "intern")],
            ..DeviceContact::default()
        });

        let snapshot =
            AttributeSnapshot::from_phonebook(&phonebook, |value| value.replace("+49 ", "0"));
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].uid, "ABC");
        assert_eq!(snapshot.rows[0].number, "09131 123456");
        assert_eq!(snapshot.rows[0].vanity.as_deref(), Some("AX"));
        assert_eq!(snapshot.rows[0].name, "Mustermann, Max");
        assert_eq!(snapshot.rows[1].number, "**9");
        assert!(!snapshot.rows[1].uid.is_empty());
    }
}
