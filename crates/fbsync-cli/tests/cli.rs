use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Output;
use tempfile::TempDir;

const CONTACTS: &str = "BEGIN:VCARD\r
VERSION:3.0\r
UID:ada\r
N:Lovelace;Ada;;;\r
FN:Ada Lovelace\r
TEL;TYPE=HOME:0911 1234\r
END:VCARD\r
BEGIN:VCARD\r
VERSION:3.0\r
UID:acme\r
FN:ACME\r
ORG:ACME GmbH\r
TEL;TYPE=WORK:0911 555\r
END:VCARD\r
";

const NO_NUMBERS: &str = "BEGIN:VCARD\r
VERSION:3.0\r
UID:nobody\r
FN:No Number\r
EMAIL:no@example.com\r
END:VCARD\r
";

const PHONEBOOK: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<phonebooks>
<phonebook name="Telefonbuch">
<contact><carddav_uid>ada</carddav_uid><telephony><number id="0" type="home">0911 1234</number><number id="1" type="fax_work">0911 9</number></telephony><person><realName>Lovelace, Ada</realName></person></contact>
<contact><carddav_uid>acme</carddav_uid><telephony><number id="0" type="fax_work">0911 556</number></telephony><person><realName>ACME GmbH</realName></person></contact>
</phonebook>
</phonebooks>
"#;

const ATTRIBUTES: &str = "uid,number,id,type,quickdial,vanity,prio,name
ada,0911 1234,0,home,1,ADA,,\"Lovelace, Ada\"
group-call,**611,0,intern,99,,,Gruppenruf
";

fn fbsync(home: &Path, args: &[&str]) -> Output {
    cargo_bin_cmd!("fbsync")
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("run command")
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let output = fbsync(home, args);
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8(output.stdout).expect("utf8")
}

fn run_json(home: &Path, args: &[&str]) -> Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    serde_json::from_str(&run_ok(home, &full)).expect("parse json")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

#[test]
fn convert_writes_device_phonebook() {
    let temp = TempDir::new().expect("temp dir");
    let source = temp.path().join("contacts.vcf");
    let dest = temp.path().join("phonebook.xml");
    fs::write(&source, CONTACTS).expect("write vcf");

    let report = run_json(temp.path(), &["convert", path_str(&source), path_str(&dest)]);
    assert_eq!(report["cards"], 2);
    assert_eq!(report["conversion"]["records"], 2);
    assert_eq!(report["conversion"]["skipped"], 0);

    let xml = fs::read_to_string(&dest).expect("read xml");
    assert!(xml.contains("<realName>Lovelace, Ada</realName>"));
    assert!(xml.contains("<realName>ACME GmbH</realName>"));
    assert!(xml.contains("0911 1234"));
    assert!(xml.contains("<carddav_uid>ada</carddav_uid>"));
}

#[test]
fn convert_without_numbers_exits_with_empty_phonebook() {
    let temp = TempDir::new().expect("temp dir");
    let source = temp.path().join("contacts.vcf");
    let dest = temp.path().join("phonebook.xml");
    fs::write(&source, NO_NUMBERS).expect("write vcf");

    let output = fbsync(temp.path(), &["convert", path_str(&source), path_str(&dest)]);
    assert_eq!(output.status.code(), Some(4));
    assert!(!dest.exists());
}

#[test]
fn convert_missing_source_fails() {
    let temp = TempDir::new().expect("temp dir");
    let dest = temp.path().join("phonebook.xml");
    let missing = temp.path().join("missing.vcf");

    let output = fbsync(temp.path(), &["convert", path_str(&missing), path_str(&dest)]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn restore_applies_attribute_backup() {
    let temp = TempDir::new().expect("temp dir");
    let input = temp.path().join("in.xml");
    let output = temp.path().join("out.xml");
    let attributes = temp.path().join("attributes.csv");
    fs::write(&input, PHONEBOOK).expect("write xml");
    fs::write(&attributes, ATTRIBUTES).expect("write csv");

    let report = run_json(
        temp.path(),
        &[
            "restore",
            "--attributes",
            path_str(&attributes),
            path_str(&input),
            path_str(&output),
        ],
    );
    assert_eq!(report["skipped_manual"], false);
    assert_eq!(report["restored"], 1);
    assert_eq!(report["internal_added"], 1);

    let xml = fs::read_to_string(&output).expect("read xml");
    assert!(xml.contains(r#"quickdial="1""#));
    assert!(xml.contains(r#"vanity="ADA""#));
    assert!(xml.contains("**611"));
    assert!(xml.contains("<realName>Gruppenruf</realName>"));
}

#[test]
fn restore_rejects_foreign_csv() {
    let temp = TempDir::new().expect("temp dir");
    let input = temp.path().join("in.xml");
    let attributes = temp.path().join("attributes.csv");
    fs::write(&input, PHONEBOOK).expect("write xml");
    fs::write(&attributes, "name,number\nAda,0911\n").expect("write csv");

    let output = fbsync(
        temp.path(),
        &[
            "restore",
            "--attributes",
            path_str(&attributes),
            path_str(&input),
            path_str(&temp.path().join("out.xml")),
        ],
    );
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn fax_lists_fax_numbers_as_csv_and_json() {
    let temp = TempDir::new().expect("temp dir");
    let input = temp.path().join("phonebook.xml");
    fs::write(&input, PHONEBOOK).expect("write xml");

    let csv = run_ok(temp.path(), &["fax", path_str(&input)]);
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "display_name,fax_number,organization,last_name,first_name",
            "\"Lovelace, Ada\",0911 9,,Lovelace,Ada",
            "ACME GmbH,0911 556,ACME GmbH,,",
        ]
    );

    let json = run_json(temp.path(), &["fax", path_str(&input)]);
    let records = json.as_array().expect("array");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["organization"], "ACME GmbH");
}

#[test]
fn fax_writes_file_when_requested() {
    let temp = TempDir::new().expect("temp dir");
    let input = temp.path().join("phonebook.xml");
    let out = temp.path().join("fax.csv");
    fs::write(&input, PHONEBOOK).expect("write xml");

    run_ok(temp.path(), &["fax", path_str(&input), "--out", path_str(&out)]);
    let written = fs::read_to_string(&out).expect("read csv");
    assert!(written.starts_with("display_name,fax_number"));
    assert!(written.contains("0911 556"));
}

#[test]
fn quickdials_from_file() {
    let temp = TempDir::new().expect("temp dir");
    let restored = temp.path().join("restored.xml");
    let input = temp.path().join("in.xml");
    let attributes = temp.path().join("attributes.csv");
    fs::write(&input, PHONEBOOK).expect("write xml");
    fs::write(&attributes, ATTRIBUTES).expect("write csv");
    run_ok(
        temp.path(),
        &[
            "restore",
            "--attributes",
            path_str(&attributes),
            path_str(&input),
            path_str(&restored),
        ],
    );

    let labels = run_json(temp.path(), &["quickdials", path_str(&restored)]);
    assert!(labels["1"].as_str().expect("label").contains("Ada"));
}

#[test]
fn completions_need_no_config() {
    let temp = TempDir::new().expect("temp dir");
    let script = run_ok(temp.path(), &["completions", "bash"]);
    assert!(script.contains("fbsync"));
}
