//! Tests for dictionary compilation.

use dcc_dictionary::{DictionaryError, compile_dictionary};
use dcc_model::{Dictionary, FileSchema, KeyErrorKind, Relation, RelationKind};

/// A clinical-style dictionary declared out of dependency order.
fn clinical_dictionary() -> Dictionary {
    Dictionary::new(vec![
        FileSchema::new(
            "ssm_m",
            ["analysis_id", "analyzed_sample_id", "matched_sample_id"],
        )
        .with_unique_fields(["analysis_id", "analyzed_sample_id"])
        .with_relation(Relation::new(
            ["analyzed_sample_id"],
            "sample",
            ["analyzed_sample_id"],
        ))
        .with_relation(
            Relation::new(["matched_sample_id"], "sample", ["analyzed_sample_id"])
                .with_condition("matched_sample_id != null"),
        ),
        FileSchema::new(
            "sample",
            ["analyzed_sample_id", "specimen_id", "raw_data_repository"],
        )
        .with_unique_fields(["analyzed_sample_id"])
        .with_relation(Relation::new(["specimen_id"], "specimen", ["specimen_id"]).bidirectional()),
        FileSchema::new("specimen", ["specimen_id", "donor_id"])
            .with_unique_fields(["specimen_id"])
            .with_relation(Relation::new(["donor_id"], "donor", ["donor_id"]).bidirectional()),
        FileSchema::new("donor", ["donor_id", "donor_sex"]).with_unique_fields(["donor_id"]),
        FileSchema::new("family", ["donor_id", "relationship_type"])
            .with_relation(Relation::new(["donor_id"], "donor", ["donor_id"]).optional()),
    ])
}

fn names(compiled: &dcc_dictionary::CompiledDictionary) -> Vec<&str> {
    compiled
        .topological_order()
        .iter()
        .map(|file_type| compiled.name(*file_type))
        .collect()
}

#[test]
fn topological_order_places_parents_first() {
    let compiled = compile_dictionary(&clinical_dictionary()).expect("compile dictionary");
    assert_eq!(
        names(&compiled),
        vec!["donor", "specimen", "family", "sample", "ssm_m"]
    );
}

#[test]
fn key_spec_indices_follow_field_positions() {
    let compiled = compile_dictionary(&clinical_dictionary()).expect("compile dictionary");
    let ssm_m = compiled.file_type("ssm_m").expect("ssm_m");
    let sample = compiled.file_type("sample").expect("sample");
    let spec = compiled.key_spec(ssm_m);

    assert_eq!(spec.field_count(), 3);
    assert_eq!(spec.primary_key(), &[0, 1]);
    assert_eq!(spec.foreign_key(sample).expect("fk").indices, vec![1]);
    let conditional = spec.conditional_key(sample).expect("conditional key");
    assert_eq!(conditional.indices, vec![2]);
    assert_eq!(conditional.condition.source(), "matched_sample_id != null");
    assert_eq!(conditional.field_names.len(), 3);
    assert!(spec.optional_keys().is_empty());
    assert_eq!(spec.referenced_types(), vec![sample]);
}

#[test]
fn composite_foreign_key_aligns_with_parent_key_order() {
    let dictionary = Dictionary::new(vec![
        FileSchema::new("analysis", ["analysis_id", "sample_id"])
            .with_unique_fields(["analysis_id", "sample_id"]),
        FileSchema::new("call", ["call_id", "sample_id", "analysis_id"])
            .with_unique_fields(["call_id"])
            .with_relation(Relation::new(
                ["sample_id", "analysis_id"],
                "analysis",
                ["sample_id", "analysis_id"],
            )),
    ]);
    let compiled = compile_dictionary(&dictionary).expect("compile dictionary");
    let call = compiled.file_type("call").expect("call");
    let analysis = compiled.file_type("analysis").expect("analysis");

    let key = compiled.key_spec(call).foreign_key(analysis).expect("fk");
    assert_eq!(key.indices, vec![2, 1]);
    assert_eq!(
        compiled
            .error_field_names(call, KeyErrorKind::Relation, Some(analysis))
            .expect("field names"),
        vec!["analysis_id", "sample_id"]
    );
}

#[test]
fn graph_queries() {
    let compiled = compile_dictionary(&clinical_dictionary()).expect("compile dictionary");
    let donor = compiled.file_type("donor").expect("donor");
    let specimen = compiled.file_type("specimen").expect("specimen");
    let family = compiled.file_type("family").expect("family");
    let sample = compiled.file_type("sample").expect("sample");
    let ssm_m = compiled.file_type("ssm_m").expect("ssm_m");

    assert_eq!(compiled.parents(ssm_m), vec![sample]);
    assert_eq!(compiled.parents(family), vec![donor]);
    assert!(compiled.has_children(donor));
    assert!(!compiled.has_children(ssm_m));
    assert_eq!(compiled.surjective_parents(specimen), vec![donor]);
    assert!(compiled.surjective_parents(family).is_empty());
    assert!(compiled.surjective_parents(ssm_m).is_empty());
    assert_eq!(compiled.graph().surjective_children(donor), vec![specimen]);

    let edges = compiled.graph().edges(ssm_m);
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[1].kind, RelationKind::Conditional);
}

#[test]
fn error_field_names_by_kind() {
    let compiled = compile_dictionary(&clinical_dictionary()).expect("compile dictionary");
    let donor = compiled.file_type("donor").expect("donor");
    let specimen = compiled.file_type("specimen").expect("specimen");
    let sample = compiled.file_type("sample").expect("sample");
    let ssm_m = compiled.file_type("ssm_m").expect("ssm_m");

    assert_eq!(
        compiled
            .error_field_names(ssm_m, KeyErrorKind::ExistingUnique, None)
            .expect("uniqueness"),
        vec!["analysis_id", "analyzed_sample_id"]
    );
    assert_eq!(
        compiled
            .error_field_names(ssm_m, KeyErrorKind::ConditionalRelation, Some(sample))
            .expect("conditional"),
        vec!["matched_sample_id"]
    );
    assert_eq!(
        compiled
            .error_field_names(donor, KeyErrorKind::Surjection, Some(specimen))
            .expect("surjection"),
        vec!["donor_id"]
    );

    let error = compiled
        .error_field_names(sample, KeyErrorKind::Surjection, Some(ssm_m))
        .expect_err("ssm_m does not cover sample");
    assert!(matches!(
        error,
        DictionaryError::UnregisteredErrorFields {
            kind: KeyErrorKind::Surjection,
            ..
        }
    ));
    assert!(
        compiled
            .error_field_names(ssm_m, KeyErrorKind::SecondaryRelation, Some(sample))
            .is_err()
    );
}

#[test]
fn registered_errors_cover_surjective_children_only() {
    let compiled = compile_dictionary(&clinical_dictionary()).expect("compile dictionary");
    let donor = compiled.file_type("donor").expect("donor");
    let specimen = compiled.file_type("specimen").expect("specimen");

    assert_eq!(
        compiled.registered_errors(donor),
        vec![
            (KeyErrorKind::ExistingUnique, None),
            (KeyErrorKind::IncrementalUnique, None),
            (KeyErrorKind::Surjection, Some(specimen)),
        ]
    );
}

#[test]
fn second_mandatory_target_is_secondary() {
    let dictionary = Dictionary::new(vec![
        FileSchema::new("donor", ["donor_id"]).with_unique_fields(["donor_id"]),
        FileSchema::new("specimen", ["specimen_id"]).with_unique_fields(["specimen_id"]),
        FileSchema::new("surgery", ["donor_id", "specimen_id"])
            .with_relation(Relation::new(["donor_id"], "donor", ["donor_id"]))
            .with_relation(Relation::new(["specimen_id"], "specimen", ["specimen_id"])),
    ]);
    let compiled = compile_dictionary(&dictionary).expect("compile dictionary");
    let surgery = compiled.file_type("surgery").expect("surgery");
    let donor = compiled.file_type("donor").expect("donor");
    let specimen = compiled.file_type("specimen").expect("specimen");
    let spec = compiled.key_spec(surgery);

    assert!(!spec.has_primary_key());
    assert_eq!(spec.mandatory_error_kind(donor), Some(KeyErrorKind::Relation));
    assert_eq!(
        spec.mandatory_error_kind(specimen),
        Some(KeyErrorKind::SecondaryRelation)
    );
    assert!(
        compiled
            .error_field_names(surgery, KeyErrorKind::ExistingUnique, None)
            .is_err()
    );
}

#[test]
fn cycle_is_named() {
    let dictionary = Dictionary::new(vec![
        FileSchema::new("a", ["id", "b_id"])
            .with_unique_fields(["id"])
            .with_relation(Relation::new(["b_id"], "b", ["id"])),
        FileSchema::new("b", ["id", "a_id"])
            .with_unique_fields(["id"])
            .with_relation(Relation::new(["a_id"], "a", ["id"])),
        FileSchema::new("c", ["id", "a_id"])
            .with_unique_fields(["id"])
            .with_relation(Relation::new(["a_id"], "a", ["id"])),
    ]);
    let error = compile_dictionary(&dictionary).expect_err("cycle");
    assert!(matches!(error, DictionaryError::CyclicDependency { .. }));
    assert!(error.is_configuration_error());
    insta::assert_snapshot!(error.to_string(), @"cyclic dependency between file types: a -> b -> a");
}

#[test]
fn self_reference_is_a_cycle() {
    let dictionary = Dictionary::new(vec![
        FileSchema::new("donor", ["donor_id", "parent_id"])
            .with_unique_fields(["donor_id"])
            .with_relation(Relation::new(["parent_id"], "donor", ["donor_id"]).optional()),
    ]);
    let error = compile_dictionary(&dictionary).expect_err("cycle");
    let DictionaryError::CyclicDependency { cycle } = error else {
        panic!("expected cycle, got {error}");
    };
    assert_eq!(cycle, vec!["donor", "donor"]);
}

#[test]
fn invalid_relations_are_rejected() {
    let donor = FileSchema::new("donor", ["donor_id"]).with_unique_fields(["donor_id"]);
    let compile_with = |relation: Relation| {
        compile_dictionary(&Dictionary::new(vec![
            donor.clone(),
            FileSchema::new("specimen", ["specimen_id", "donor_id"]).with_relation(relation),
        ]))
        .expect_err("invalid relation")
    };

    assert!(matches!(
        compile_with(Relation::new(["donor_id"], "patient", ["donor_id"])),
        DictionaryError::UnknownFileType { .. }
    ));
    assert!(matches!(
        compile_with(Relation::new(["subject_id"], "donor", ["donor_id"])),
        DictionaryError::UnknownField { .. }
    ));
    assert!(matches!(
        compile_with(Relation::new(["donor_id"], "donor", ["donor_sex"])),
        DictionaryError::RelationMismatch { .. }
    ));
    assert!(matches!(
        compile_with(
            Relation::new(["donor_id"], "donor", ["donor_id"])
                .optional()
                .bidirectional()
        ),
        DictionaryError::InvalidRelation { .. }
    ));
    assert!(matches!(
        compile_with(Relation::new(["donor_id", "specimen_id"], "donor", ["donor_id"])),
        DictionaryError::InvalidRelation { .. }
    ));
    assert!(matches!(
        compile_with(
            Relation::new(["donor_id"], "donor", ["donor_id"]).with_condition("donor_id ==")
        ),
        DictionaryError::Condition { .. }
    ));
}

#[test]
fn duplicate_declarations_are_rejected() {
    let duplicate_relation = Dictionary::new(vec![
        FileSchema::new("donor", ["donor_id"]).with_unique_fields(["donor_id"]),
        FileSchema::new("specimen", ["donor_id", "other_donor_id"])
            .with_relation(Relation::new(["donor_id"], "donor", ["donor_id"]))
            .with_relation(Relation::new(["other_donor_id"], "donor", ["donor_id"])),
    ]);
    assert!(matches!(
        compile_dictionary(&duplicate_relation).expect_err("duplicate relation"),
        DictionaryError::DuplicateRelation {
            kind: "mandatory",
            ..
        }
    ));

    let duplicate_type = Dictionary::new(vec![
        FileSchema::new("donor", ["donor_id"]),
        FileSchema::new("donor", ["donor_id"]),
    ]);
    assert!(matches!(
        compile_dictionary(&duplicate_type).expect_err("duplicate type"),
        DictionaryError::DuplicateFileType { .. }
    ));

    let duplicate_field = Dictionary::new(vec![FileSchema::new("donor", ["donor_id", "donor_id"])]);
    assert!(matches!(
        compile_dictionary(&duplicate_field).expect_err("duplicate field"),
        DictionaryError::DuplicateField { .. }
    ));
}

#[test]
fn relation_to_type_without_primary_key_is_rejected() {
    let dictionary = Dictionary::new(vec![
        FileSchema::new("donor", ["donor_id"]),
        FileSchema::new("specimen", ["donor_id"])
            .with_relation(Relation::new(["donor_id"], "donor", ["donor_id"])),
    ]);
    assert!(matches!(
        compile_dictionary(&dictionary).expect_err("no primary key"),
        DictionaryError::NoPrimaryKey { .. }
    ));
}

#[test]
fn graph_serializes() {
    let compiled = compile_dictionary(&clinical_dictionary()).expect("compile dictionary");
    let json = serde_json::to_value(compiled.graph()).expect("serialize graph");
    assert_eq!(json["parents"].as_array().map(Vec::len), Some(5));
}

#[test]
fn names_differing_only_by_whitespace_are_duplicates() {
    let dictionary = Dictionary::new(vec![
        FileSchema::new("donor ", ["donor_id"]).with_unique_fields(["donor_id"]),
        FileSchema::new("donor", ["donor_id"]).with_unique_fields(["donor_id"]),
    ]);
    match compile_dictionary(&dictionary).expect_err("duplicate after trimming") {
        DictionaryError::DuplicateFileType { name } => assert_eq!(name, "donor"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn relations_resolve_against_trimmed_names() {
    let dictionary = Dictionary::new(vec![
        FileSchema::new("donor ", ["donor_id"]).with_unique_fields(["donor_id"]),
        FileSchema::new("specimen", ["specimen_id", "donor_id"])
            .with_unique_fields(["specimen_id"])
            .with_relation(Relation::new(["donor_id"], " donor", ["donor_id"]).bidirectional()),
    ]);
    let compiled = compile_dictionary(&dictionary).expect("compile dictionary");

    assert_eq!(names(&compiled), vec!["donor", "specimen"]);
    let donor = compiled.file_type("donor").expect("donor");
    let specimen = compiled.file_type("specimen").expect("specimen");
    assert_eq!(compiled.parents(specimen), vec![donor]);
    assert_eq!(compiled.surjective_parents(specimen), vec![donor]);
}
