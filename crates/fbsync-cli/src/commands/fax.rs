use crate::commands::{print_json, read_phonebook_file, Context};
use anyhow::{Context as _, Result};
use clap::Args;
use fbsync_core::{extract_fax_records, FaxRecord};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct FaxArgs {
    /// Phonebook XML as exported by the device or by `convert`
    pub input: PathBuf,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn fax(ctx: &Context<'_>, args: FaxArgs) -> Result<()> {
    let phonebook = read_phonebook_file(&args.input)?;
    let records = extract_fax_records(
        &phonebook,
        &ctx.config.conversions.fax_type,
        &ctx.config.name_separator,
    );

    match args.out.as_deref() {
        Some(path) => write_fax_records(path, &records)?,
        None if ctx.json => print_json(&records)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(fax_csv(&records)?.as_bytes())?;
        }
    }
    Ok(())
}

pub fn write_fax_records(path: &Path, records: &[FaxRecord]) -> Result<()> {
    let csv = fax_csv(records)?;
    std::fs::write(path, csv).with_context(|| format!("write {}", path.display()))
}

fn fax_csv(records: &[FaxRecord]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    if records.is_empty() {
        writer.write_record([
            "display_name",
            "fax_number",
            "organization",
            "last_name",
            "first_name",
        ])?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::fax_csv;
    use fbsync_core::FaxRecord;

    #[test]
    fn csv_has_header_even_when_empty() {
        assert_eq!(
            fax_csv(&[]).expect("csv"),
            "display_name,fax_number,organization,last_name,first_name\n"
        );
    }

    #[test]
    fn csv_rows_follow_record_fields() {
        let records = vec![FaxRecord {
            display_name: "Muster, Erika".to_string(),
            fax_number: "0911 9".to_string(),
            organization: String::new(),
            last_name: "Muster".to_string(),
            first_name: "Erika".to_string(),
        }];
        assert_eq!(
            fax_csv(&records).expect("csv"),
            "display_name,fax_number,organization,last_name,first_name\n\"Muster, Erika\",0911 9,,Muster,Erika\n"
        );
    }
}
