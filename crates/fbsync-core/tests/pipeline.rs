use fbsync_core::{
    apply_filters, dissolve_groups, export_phonebook, extract_fax_records, reconcile,
    AttributeSnapshot, CanonicalContact, ConversionConfig, Converter, FilterRules, GroupCard,
    NormalizedCard, PreservedAttributes, RawPhone, ReconcileOutcome, Replacement, TagAttribute,
    TagRules, TypeMapping,
};

fn conversions() -> ConversionConfig {
    ConversionConfig {
        phone_types: vec![
            TypeMapping::new("WORK", "work"),
            TypeMapping::new("HOME", "home"),
            TypeMapping::new("CELL", "mobile"),
            TypeMapping::new("FAX", "fax_work"),
        ],
        phone_replacements: vec![
            Replacement::new("+49 ", "0"),
            Replacement::new("-", ""),
            Replacement::new("/", ""),
        ],
        name_rules: vec![
            "{lastname}, {firstname}".to_string(),
            "{organization}".to_string(),
            "{fullname}".to_string(),
        ],
        vip: TagRules::new().with(TagAttribute::Groups, ["family"]),
        ..ConversionConfig::default()
    }
}

fn card(id: &str, last: &str, first: &str, phones: Vec<RawPhone>) -> NormalizedCard {
    let mut contact = CanonicalContact::with_id(id);
    contact.name.last = last.to_string();
    contact.name.first = first.to_string();
    contact.full_name = format!("{first} {last}");
    contact.phones = phones;
    NormalizedCard::Contact(contact)
}

fn cards() -> Vec<NormalizedCard> {
    vec![
        card(
            "max",
            "Mustermann",
            "Max",
            vec![
                RawPhone::new("+49 911 123-456", &["HOME"]),
                RawPhone::new("0911 / 999", &["WORK", "FAX"]),
            ],
        ),
        card("erika", "Musterfrau", "Erika", vec![RawPhone::new("0170 1", &["CELL"])]),
        card("nophone", "Leer", "Lea", Vec::new()),
        NormalizedCard::Group(GroupCard {
            name: "family".to_string(),
            member_ids: vec!["urn:uuid:max".to_string()],
        }),
        NormalizedCard::Group(GroupCard {
            name: "archive".to_string(),
            member_ids: vec!["urn:uuid:erika".to_string()],
        }),
    ]
}

#[test]
fn full_pipeline_restores_device_state() {
    let converter = Converter::new(conversions()).expect("converter");

    let dissolved = dissolve_groups(cards());
    assert_eq!(dissolved.groups, 2);
    assert_eq!(dissolved.contacts.len(), 3);

    let rules = FilterRules {
        include: TagRules::new(),
        exclude: TagRules::new().with(TagAttribute::Groups, ["archive"]),
    };
    let filtered = apply_filters(dissolved.contacts, &rules);
    assert_eq!(filtered.excluded, 1);

    let (mut phonebook, report) = export_phonebook(&converter, "Telefonbuch", &filtered.contacts);
    assert_eq!(report.contacts_in, 2);
    assert_eq!(report.records_out, 1);
    assert_eq!(report.skipped, 1);

    let max = &phonebook.contacts[0];
    assert!(max.vip);
    assert_eq!(max.name, "Mustermann, Max");
    assert_eq!(max.numbers[0].number, "0911 123456");
    assert_eq!(max.numbers[0].kind, "home");
    assert_eq!(max.numbers[1].kind, "fax_work");

    let mut prior = phonebook.clone();
    prior.contacts[0].numbers[0].number = "+49 911 123456".to_string();
    prior.contacts[0].numbers[0].quickdial = Some("2".to_string());
    let preserved = PreservedAttributes::extract(&prior, |raw| converter.cleanup_number(raw));

    let outcome = reconcile(&mut phonebook, &preserved);
    assert_eq!(
        outcome,
        ReconcileOutcome::Merged {
            restored: 1,
            internal_added: 0
        }
    );
    assert_eq!(phonebook.contacts[0].numbers[0].quickdial.as_deref(), Some("2"));

    let fax = extract_fax_records(&phonebook, "fax_work", ", ");
    assert_eq!(fax.len(), 1);
    assert_eq!(fax[0].fax_number, "0911 999");
    assert_eq!(fax[0].first_name, "Max");
}

#[test]
fn csv_snapshot_restores_like_live_readback() {
    let converter = Converter::new(conversions()).expect("converter");
    let contacts: Vec<CanonicalContact> = dissolve_groups(cards()).contacts;
    let (fresh, _) = export_phonebook(&converter, "Telefonbuch", &contacts);

    let mut prior = fresh.clone();
    prior.contacts[0].numbers[0].vanity = Some("MAX".to_string());
    let snapshot = AttributeSnapshot::from_phonebook(&prior, |raw| converter.cleanup_number(raw));
    let csv = snapshot.to_csv().expect("to csv");
    let restored_snapshot = AttributeSnapshot::from_csv(&csv).expect("from csv");
    assert_eq!(restored_snapshot, snapshot);

    let mut live = fresh.clone();
    reconcile(&mut live, &PreservedAttributes::from_snapshot(&snapshot));
    let mut from_csv = fresh;
    reconcile(&mut from_csv, &PreservedAttributes::from_snapshot(&restored_snapshot));
    assert_eq!(live, from_csv);
    assert_eq!(live.contacts[0].numbers[0].vanity.as_deref(), Some("MAX"));
}
