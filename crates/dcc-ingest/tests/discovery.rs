//! Tests for submission file discovery.

use std::fs;

use dcc_dictionary::compile_dictionary;
use dcc_ingest::{DirectoryRowSource, IngestError, LineNumbering, RowSource, default_pattern};
use dcc_model::{Dictionary, FileSchema, Relation};

fn dictionary() -> dcc_dictionary::CompiledDictionary {
    compile_dictionary(&Dictionary::new(vec![
        FileSchema::new("donor", ["donor_id"]).with_unique_fields(["donor_id"]),
        FileSchema::new("specimen", ["specimen_id", "donor_id"])
            .with_unique_fields(["specimen_id"])
            .with_relation(Relation::new(["donor_id"], "donor", ["donor_id"])),
        FileSchema::new("ssm_m", ["analysis_id"]).with_pattern(r"^ssm_m\.txt$"),
    ]))
    .expect("compile dictionary")
}

#[test]
fn default_pattern_matches_shards() {
    let regex = regex::Regex::new(&default_pattern("ssm_p")).expect("regex");
    assert!(regex.is_match("ssm_p.txt"));
    assert!(regex.is_match("ssm_p.part-2.tsv"));
    assert!(!regex.is_match("ssm_p.txt.gz"));
    assert!(!regex.is_match("ssm_pp.txt"));
}

#[test]
fn files_are_grouped_by_type() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("donor.txt"), "donor_id\nD1\n").expect("write");
    fs::write(dir.path().join("specimen.b.txt"), "specimen_id\tdonor_id\nS2\tD1\n").expect("write");
    fs::write(dir.path().join("specimen.a.txt"), "specimen_id\tdonor_id\nS1\tD1\n").expect("write");
    fs::write(dir.path().join("ssm_m.txt"), "analysis_id\nA1\n").expect("write");
    fs::write(dir.path().join("README.md"), "notes").expect("write");
    fs::write(dir.path().join(".donor.txt"), "hidden").expect("write");

    let compiled = dictionary();
    let source = DirectoryRowSource::discover(dir.path(), &compiled).expect("discover");
    let specimen = compiled.file_type("specimen").expect("specimen");
    let donor = compiled.file_type("donor").expect("donor");

    assert_eq!(source.file_count(), 4);
    assert_eq!(source.files(specimen), vec!["specimen.a.txt", "specimen.b.txt"]);
    assert_eq!(source.files(donor), vec!["donor.txt"]);

    let mut stream = source.open(specimen, "specimen.b.txt").expect("open");
    let row = stream.next_row().expect("row").expect("valid row");
    assert_eq!(row.line, 1);
    assert_eq!(row.values, vec!["S2", "D1"]);
}

#[test]
fn line_numbering_is_configurable() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("donor.txt"), "donor_id\nD1\nD2\n").expect("write");
    let compiled = dictionary();
    let donor = compiled.file_type("donor").expect("donor");
    let source = DirectoryRowSource::discover(dir.path(), &compiled)
        .expect("discover")
        .with_line_numbering(LineNumbering::Physical);

    let mut stream = source.open(donor, "donor.txt").expect("open");
    stream.next_row().expect("row").expect("valid row");
    let second = stream.next_row().expect("row").expect("valid row");
    assert_eq!(second.line, 3);
}

#[test]
fn ambiguous_patterns_are_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("donor.txt"), "donor_id\n").expect("write");
    let compiled = compile_dictionary(&Dictionary::new(vec![
        FileSchema::new("donor", ["donor_id"]),
        FileSchema::new("patient", ["donor_id"]).with_pattern(r"^donor\.txt$"),
    ]))
    .expect("compile dictionary");

    let error = DirectoryRowSource::discover(dir.path(), &compiled).expect_err("ambiguous");
    assert!(matches!(error, IngestError::AmbiguousFile { .. }));
}

#[test]
fn missing_directory_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = DirectoryRowSource::discover(&dir.path().join("absent"), &dictionary())
        .expect_err("missing directory");
    assert!(matches!(error, IngestError::DirectoryNotFound { .. }));
}
