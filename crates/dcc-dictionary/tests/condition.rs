//! Tests for conditional-relation predicates.

use std::sync::Arc;

use dcc_dictionary::{ConditionError, ConditionEvaluator, InvalidRowError};

const SAMPLE_FIELDS: [&str; 4] = [
    "analyzed_sample_id",
    "specimen_id",
    "raw_data_repository",
    "percentage_cellularity",
];

fn sample_row(repository: &str, cellularity: &str) -> Vec<String> {
    vec![
        "SA1".to_string(),
        "SP1".to_string(),
        repository.to_string(),
        cellularity.to_string(),
    ]
}

fn compile(source: &str) -> ConditionEvaluator {
    ConditionEvaluator::compile(source, &SAMPLE_FIELDS).expect("compile condition")
}

#[test]
fn membership_in_list() {
    let condition = compile("raw_data_repository in ['AWS', 'Collab']");
    assert!(condition.evaluate(&sample_row("AWS", "")).expect("evaluate"));
    assert!(condition.evaluate(&sample_row("Collab", "")).expect("evaluate"));
    assert!(!condition.evaluate(&sample_row("local", "")).expect("evaluate"));
    assert!(!condition.evaluate(&sample_row("aws", "")).expect("evaluate"));
}

#[test]
fn set_notation_and_negation() {
    let member = compile(r#"raw_data_repository ∈ {"AWS", "Collab"}"#);
    let not_member = compile(r#"raw_data_repository not in {"AWS", "Collab"}"#);
    let row = sample_row("EGA", "");
    assert!(!member.evaluate(&row).expect("evaluate"));
    assert!(not_member.evaluate(&row).expect("evaluate"));
}

#[test]
fn and_binds_tighter_than_or() {
    let condition = compile(
        "raw_data_repository == 'EGA' || raw_data_repository == 'AWS' && percentage_cellularity > 50",
    );
    assert!(condition.evaluate(&sample_row("EGA", "10")).expect("evaluate"));
    assert!(!condition.evaluate(&sample_row("AWS", "10")).expect("evaluate"));
    assert!(condition.evaluate(&sample_row("AWS", "75")).expect("evaluate"));

    let grouped = compile(
        "(raw_data_repository == 'EGA' or raw_data_repository == 'AWS') and not percentage_cellularity > 50",
    );
    assert!(grouped.evaluate(&sample_row("AWS", "10")).expect("evaluate"));
    assert!(!grouped.evaluate(&sample_row("AWS", "75")).expect("evaluate"));
}

#[test]
fn null_matches_empty_values() {
    let present = compile("raw_data_repository != null");
    assert!(!present.evaluate(&sample_row("", "")).expect("evaluate"));
    assert!(present.evaluate(&sample_row("AWS", "")).expect("evaluate"));
}

#[test]
fn empty_string_literal_matches_empty_values() {
    let missing = compile("raw_data_repository == ''");
    assert!(missing.evaluate(&sample_row("", "")).expect("evaluate"));
    assert!(!missing.evaluate(&sample_row("AWS", "")).expect("evaluate"));

    let listed = compile("raw_data_repository in ['', \"AWS\"]");
    assert!(listed.evaluate(&sample_row("", "")).expect("evaluate"));
    assert!(listed.evaluate(&sample_row("AWS", "")).expect("evaluate"));
    assert!(!listed.evaluate(&sample_row("Collab", "")).expect("evaluate"));

    let present = compile("raw_data_repository not in [\"\"]");
    assert!(!present.evaluate(&sample_row("", "")).expect("evaluate"));
    assert!(present.evaluate(&sample_row("EGA", "")).expect("evaluate"));
}

#[test]
fn ordering_is_numeric_only() {
    let condition = compile("percentage_cellularity >= 20");
    assert!(condition.evaluate(&sample_row("AWS", "20")).expect("evaluate"));
    assert!(condition.evaluate(&sample_row("AWS", "100")).expect("evaluate"));
    assert!(!condition.evaluate(&sample_row("AWS", "-888")).expect("evaluate"));
    assert!(!condition.evaluate(&sample_row("AWS", "n/a")).expect("evaluate"));
}

#[test]
fn constants() {
    assert!(compile("true").evaluate(&sample_row("", "")).expect("evaluate"));
    assert!(!compile("!true").evaluate(&sample_row("", "")).expect("evaluate"));
}

#[test]
fn arity_mismatch_is_an_invalid_row() {
    let condition = compile("raw_data_repository == 'AWS'");
    let error = condition
        .evaluate(&["SA1", "SP1"])
        .expect_err("short row");
    assert_eq!(
        error,
        InvalidRowError {
            expected: 4,
            actual: 2
        }
    );
}

#[test]
fn compile_errors() {
    assert_eq!(
        ConditionEvaluator::compile("donor_sex == 'male'", &SAMPLE_FIELDS).unwrap_err(),
        ConditionError::UnknownField {
            name: "donor_sex".to_string()
        }
    );
    assert_eq!(
        ConditionEvaluator::compile("   ", &SAMPLE_FIELDS).unwrap_err(),
        ConditionError::Empty
    );
    assert!(matches!(
        ConditionEvaluator::compile("raw_data_repository == 'AWS", &SAMPLE_FIELDS).unwrap_err(),
        ConditionError::UnterminatedString { .. }
    ));
    assert!(matches!(
        ConditionEvaluator::compile("raw_data_repository == 'AWS' 'x'", &SAMPLE_FIELDS)
            .unwrap_err(),
        ConditionError::Unexpected {
            expected: "end of condition",
            ..
        }
    ));
    assert!(matches!(
        ConditionEvaluator::compile("raw_data_repository", &SAMPLE_FIELDS).unwrap_err(),
        ConditionError::Unexpected { .. }
    ));
}

#[test]
fn evaluator_is_shareable_across_threads() {
    let condition = Arc::new(compile("raw_data_repository in ['AWS', 'Collab']"));
    let results: Vec<bool> = std::thread::scope(|scope| {
        let handles: Vec<_> = ["AWS", "local", "Collab", "EGA"]
            .into_iter()
            .map(|repository| {
                let condition = Arc::clone(&condition);
                scope.spawn(move || {
                    condition
                        .evaluate(&sample_row(repository, ""))
                        .expect("evaluate")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .collect()
    });
    assert_eq!(results, vec![true, false, true, false]);
}
