//! Tests for key extraction, digests and error bookkeeping.

use dcc_dictionary::{CompiledDictionary, compile_dictionary};
use dcc_model::{Dictionary, FileSchema, KeyErrorKind, Relation, TieBreak};
use dcc_validate::{
    Digest, Insertion, KVFileErrors, KVRowError, KVSubmissionErrors, KeyValidationError,
    RowKeyExtractor, is_not_applicable,
};

fn dictionary() -> CompiledDictionary {
    compile_dictionary(&Dictionary::new(vec![
        FileSchema::new("donor", ["donor_id"]).with_unique_fields(["donor_id"]),
        FileSchema::new("specimen", ["specimen_id", "project", "donor_id"])
            .with_unique_fields(["specimen_id", "project"])
            .with_relation(Relation::new(["donor_id"], "donor", ["donor_id"]).bidirectional()),
        FileSchema::new(
            "sample",
            ["sample_id", "specimen_project", "specimen_id", "repository", "accession"],
        )
        .with_unique_fields(["sample_id"])
        .with_relation(Relation::new(
            ["specimen_id", "specimen_project"],
            "specimen",
            ["specimen_id", "project"],
        ))
        .with_relation(
            Relation::new(["accession"], "donor", ["donor_id"]).with_condition("repository == 'EGA'"),
        ),
    ]))
    .expect("compile dictionary")
}

fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

#[test]
fn extractor_aligns_composite_keys_with_parent_order() {
    let dictionary = dictionary();
    let sample = dictionary.file_type("sample").expect("sample");
    let specimen = dictionary.file_type("specimen").expect("specimen");
    let donor = dictionary.file_type("donor").expect("donor");
    let extractor = RowKeyExtractor::new(dictionary.key_spec(sample));

    let keys = extractor
        .extract(&row(&["SA1", "P1", "SP1", "local", "D1"]))
        .expect("extract");
    assert_eq!(keys.primary_key, Some(row(&["SA1"])));
    assert_eq!(keys.foreign_key(specimen), Some(&row(&["SP1", "P1"])[..]));
    assert_eq!(keys.conditional_key(donor), None);

    let keys = extractor
        .extract(&row(&["SA1", "P1", "SP1", "EGA", "D1"]))
        .expect("extract");
    assert_eq!(keys.conditional_key(donor), Some(&row(&["D1"])[..]));
}

#[test]
fn extractor_is_deterministic() {
    let dictionary = dictionary();
    let sample = dictionary.file_type("sample").expect("sample");
    let extractor = RowKeyExtractor::new(dictionary.key_spec(sample));
    let values = row(&["SA1", "P1", "SP1", "EGA", "D1"]);
    assert_eq!(
        extractor.extract(&values).expect("extract"),
        extractor.extract(&values).expect("extract")
    );
}

#[test]
fn extractor_rejects_rows_of_the_wrong_width_for_conditions() {
    let dictionary = dictionary();
    let sample = dictionary.file_type("sample").expect("sample");
    let extractor = RowKeyExtractor::new(dictionary.key_spec(sample));
    let error = extractor.extract(&row(&["SA1", "P1"])).expect_err("short row");
    assert_eq!(error.expected, 5);
    assert_eq!(error.actual, 2);
}

#[test]
fn not_applicable_values() {
    assert!(is_not_applicable(&row(&["-888"])));
    assert!(is_not_applicable(&row(&["D1", ""])));
    assert!(!is_not_applicable(&row(&["-777"])));
    assert!(!is_not_applicable(&row(&["D1"])));
}

#[test]
fn digest_keeps_first_occurrence() {
    let mut digest = Digest::new();
    assert_eq!(digest.insert(&row(&["D1"]), 0), Insertion::New(0));
    assert_eq!(digest.insert(&row(&["D2"]), 1), Insertion::New(1));
    assert_eq!(digest.insert(&row(&["D1"]), 1), Insertion::Duplicate(0));

    let first = digest.entry(0).expect("entry");
    assert_eq!(first.shard, 0);
    assert_eq!(first.duplicates, 1);
    assert!(!first.referenced);

    assert_eq!(digest.mark_referenced(&row(&["D2"])), Some(1));
    assert_eq!(digest.mark_referenced(&row(&["D9"])), None);
    let unreferenced: Vec<_> = digest.unreferenced().map(|entry| entry.tuple.clone()).collect();
    assert_eq!(unreferenced, vec![row(&["D1"])]);
    assert_eq!(digest.duplicate_count(), 1);
}

#[test]
fn unregistered_kinds_fail_loudly() {
    let dictionary = dictionary();
    let donor = dictionary.file_type("donor").expect("donor");
    let specimen = dictionary.file_type("specimen").expect("specimen");
    let mut errors = KVFileErrors::new(&dictionary, donor, TieBreak::default()).expect("errors");

    assert!(errors.is_registered(KeyErrorKind::ExistingUnique, None));
    assert!(errors.is_registered(KeyErrorKind::Surjection, Some(specimen)));
    assert!(!errors.is_registered(KeyErrorKind::Relation, Some(specimen)));

    let error = errors
        .report(0, 1, KVRowError::new(KeyErrorKind::Relation, Some(specimen), row(&["x"])))
        .expect_err("unregistered");
    assert!(matches!(
        &error,
        KeyValidationError::UnregisteredError { file_type, related, .. }
            if file_type == "donor" && related == "specimen"
    ));
    assert!(error.is_configuration_error());
    let message = error.to_string();
    assert!(message.contains("donor") && message.contains("specimen"), "{message}");
    assert!(!message.contains('#'), "{message}");
}

#[test]
fn one_violation_per_line() {
    let dictionary = dictionary();
    let specimen = dictionary.file_type("specimen").expect("specimen");
    let donor = dictionary.file_type("donor").expect("donor");
    let mut errors =
        KVFileErrors::new(&dictionary, specimen, TieBreak::UniquenessFirst).expect("errors");
    let shard = errors.register_file("specimen.txt");
    assert_eq!(errors.register_file("specimen.txt"), shard);

    let relation = KVRowError::new(KeyErrorKind::Relation, Some(donor), row(&["D9"]));
    let unique = KVRowError::new(KeyErrorKind::ExistingUnique, None, row(&["S1", "P1"]));
    assert!(errors.report(shard, 4, relation.clone()).expect("report"));
    assert!(errors.report(shard, 4, unique).expect("report"));
    assert!(!errors.report(shard, 4, relation).expect("report"));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.count(KeyErrorKind::ExistingUnique), 1);

    let mut records = Vec::new();
    let valid = errors.describe(&dictionary, &mut records).expect("describe");
    assert!(!valid);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].field_names, vec!["specimen_id", "project"]);
    assert_eq!(records[0].value, vec!["S1", "P1"]);
}

#[test]
fn submission_errors_follow_dependency_order() {
    let dictionary = dictionary();
    let donor = dictionary.file_type("donor").expect("donor");
    let specimen = dictionary.file_type("specimen").expect("specimen");
    let mut errors = KVSubmissionErrors::new(&dictionary, TieBreak::default()).expect("errors");
    assert!(errors.is_empty());

    let specimen_errors = errors.file_mut(specimen);
    let shard = specimen_errors.register_file("specimen.txt");
    specimen_errors
        .report(
            shard,
            7,
            KVRowError::new(KeyErrorKind::Relation, Some(donor), row(&["D9"])),
        )
        .expect("report");
    specimen_errors
        .report(
            shard,
            2,
            KVRowError::new(KeyErrorKind::ExistingUnique, None, row(&["S1", "P1"])),
        )
        .expect("report");
    let donor_errors = errors.file_mut(donor);
    let shard = donor_errors.register_file("donor.txt");
    donor_errors
        .report(
            shard,
            -1,
            KVRowError::new(KeyErrorKind::Surjection, Some(specimen), row(&["D4"])),
        )
        .expect("report");

    let (valid, records) = errors.describe(&dictionary).expect("describe");
    assert!(!valid);
    let order: Vec<(&str, i64)> = records
        .iter()
        .map(|record| (record.file_name.as_str(), record.line_number))
        .collect();
    assert_eq!(
        order,
        vec![("donor.txt", -1), ("specimen.txt", 2), ("specimen.txt", 7)]
    );
    assert_eq!(records[0].params.other_schema.as_deref(), Some("specimen"));
    assert_eq!(records[0].params.other_fields, vec!["donor_id"]);
    assert_eq!(records[2].params.other_fields, vec!["donor_id"]);
}
