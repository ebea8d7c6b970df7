//! Referential key validation.
//!
//! [`ReferentialValidator`] walks the file types of a submission in
//! dependency order. Every row of a type is checked for primary-key
//! uniqueness against that type's [`Digest`] and for each applicable foreign
//! key against the digest of the referenced type, which is complete by then.
//! Once a type is exhausted, every parent it must cover is scanned for
//! tuples the type never referenced.
//!
//! Constraint violations are collected; malformed rows, unreadable files and
//! cancellation abort the run.

use std::fmt;

use tracing::{debug, info, info_span, warn};

use dcc_dictionary::{CompiledDictionary, KeySpec};
use dcc_ingest::RowSource;
use dcc_model::{CancelFlag, FileType, KeyErrorKind, SURJECTION_LINE_NUMBER, TieBreak};

use crate::digest::{Digest, Insertion};
use crate::error::{KeyValidationError, Result};
use crate::errors::{KVRowError, KVSubmissionErrors};
use crate::extract::{KVRow, RowKeyExtractor, is_not_applicable};
use crate::oracle::PreviousReleaseOracle;
use crate::report::{FileTypeSummary, KeyValidationReport};

/// Rows between two progress log lines.
pub const PROGRESS_INTERVAL: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    StreamRows,
    SurjectionCheck,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Init => "init",
            Phase::StreamRows => "stream_rows",
            Phase::SurjectionCheck => "surjection_check",
            Phase::Done => "done",
            Phase::Failed => "failed",
        })
    }
}

/// Key validator for one submission.
///
/// The validator itself is immutable; all per-run state lives in the run
/// started by [`ReferentialValidator::validate`], so one validator may be
/// used for several submissions in turn.
pub struct ReferentialValidator<'a> {
    dictionary: &'a CompiledDictionary,
    oracle: Option<&'a dyn PreviousReleaseOracle>,
    tie_break: TieBreak,
    cancel: CancelFlag,
    progress_interval: u64,
}

impl<'a> ReferentialValidator<'a> {
    pub fn new(dictionary: &'a CompiledDictionary) -> Self {
        Self {
            dictionary,
            oracle: None,
            tie_break: TieBreak::default(),
            cancel: CancelFlag::new(),
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// Check primary keys against, and resolve missing foreign keys from,
    /// an earlier release.
    #[must_use]
    pub fn with_oracle(mut self, oracle: &'a dyn PreviousReleaseOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Flag polled before each file type.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_progress_interval(mut self, rows: u64) -> Self {
        self.progress_interval = rows.max(1);
        self
    }

    /// Validate every file type `source` provides.
    pub fn validate(&self, source: &dyn RowSource) -> Result<KeyValidationReport> {
        let span = info_span!("key_validation", file_types = self.dictionary.len());
        let _guard = span.enter();

        let mut run = Run::new(self.dictionary, self.tie_break)?;
        for &file_type in self.dictionary.topological_order() {
            if let Err(error) = self.process_file_type(&mut run, source, file_type) {
                run.transition(Phase::Failed);
                warn!(file_type = self.dictionary.name(file_type), %error, "key validation failed");
                return Err(error);
            }
        }
        run.transition(Phase::Done);
        run.into_report()
    }

    fn process_file_type(
        &self,
        run: &mut Run<'_>,
        source: &dyn RowSource,
        file_type: FileType,
    ) -> Result<()> {
        let name = self.dictionary.name(file_type);
        if self.cancel.is_cancelled() {
            return Err(KeyValidationError::Cancelled {
                file_type: name.to_string(),
            });
        }

        let files = source.files(file_type);
        if files.is_empty() {
            debug!(file_type = name, "no files, skipping");
            return Ok(());
        }
        let span = info_span!("file_type", file_type = name);
        let _guard = span.enter();
        info!(files = files.len(), "validating keys");
        run.transition(Phase::StreamRows);

        let spec = self.dictionary.key_spec(file_type);
        let extractor = RowKeyExtractor::new(spec);
        let mut coverage: Vec<Coverage> = self
            .dictionary
            .surjective_parents(file_type)
            .into_iter()
            .map(|parent| Coverage::new(parent, run.digests[parent.index()].len()))
            .collect();

        let mut rows: u64 = 0;
        for file_name in &files {
            let shard = run.errors.file_mut(file_type).register_file(file_name);
            let mut stream = source
                .open(file_type, file_name)
                .map_err(|source| KeyValidationError::io(name, source))?;
            while let Some(row) = stream.next_row() {
                let row = row.map_err(|source| KeyValidationError::io(name, source))?;
                if row.values.len() != spec.field_count() {
                    return Err(KeyValidationError::MalformedRow {
                        file: file_name.clone(),
                        line: row.line,
                        expected: spec.field_count(),
                        actual: row.values.len(),
                    });
                }
                let keys = extractor.extract(&row.values).map_err(|source| {
                    KeyValidationError::InvalidRow {
                        file: file_name.clone(),
                        line: row.line,
                        source,
                    }
                })?;
                let location = Location {
                    file_type,
                    shard,
                    line: row.line,
                };
                self.check_row(run, spec, location, &keys, &mut coverage)?;

                rows += 1;
                if rows % self.progress_interval == 0 {
                    info!(rows, file = %file_name, "processed rows");
                }
            }
        }

        let digest = &run.digests[file_type.index()];
        info!(
            rows,
            distinct_keys = digest.len(),
            duplicates = digest.duplicate_count(),
            "digest complete"
        );
        run.summaries[file_type.index()] = FileTypeSummary {
            name: name.to_string(),
            files: files.len(),
            rows,
            distinct_keys: digest.len(),
            duplicates: digest.duplicate_count(),
            errors: 0,
        };

        run.transition(Phase::SurjectionCheck);
        for tracker in &coverage {
            Self::check_surjection(run, file_type, tracker)?;
        }
        Ok(())
    }

    fn check_row(
        &self,
        run: &mut Run<'_>,
        spec: &KeySpec,
        at: Location,
        keys: &KVRow,
        coverage: &mut [Coverage],
    ) -> Result<()> {
        if let Some(primary_key) = &keys.primary_key {
            if self.in_previous_release(at.file_type, primary_key) {
                run.report(at, KeyErrorKind::IncrementalUnique, None, primary_key)?;
            } else if let Insertion::Duplicate(_) =
                run.digests[at.file_type.index()].insert(primary_key, at.shard)
            {
                run.report(at, KeyErrorKind::ExistingUnique, None, primary_key)?;
            }
        }

        for (parent, tuple) in &keys.foreign_keys {
            match run.digests[parent.index()].mark_referenced(tuple) {
                Some(position) => {
                    if let Some(tracker) = coverage.iter_mut().find(|tracker| tracker.parent == *parent) {
                        tracker.cover(position);
                    }
                }
                None if self.in_previous_release(*parent, tuple) => {}
                None => {
                    let kind = spec
                        .mandatory_error_kind(*parent)
                        .unwrap_or(KeyErrorKind::Relation);
                    run.report(at, kind, Some(*parent), tuple)?;
                }
            }
        }

        for (parent, tuple) in &keys.optional_keys {
            if is_not_applicable(tuple) {
                continue;
            }
            self.check_reference(run, at, KeyErrorKind::OptionalRelation, *parent, tuple)?;
        }

        for (parent, tuple) in &keys.conditional_keys {
            self.check_reference(run, at, KeyErrorKind::ConditionalRelation, *parent, tuple)?;
        }
        Ok(())
    }

    fn check_reference(
        &self,
        run: &mut Run<'_>,
        at: Location,
        kind: KeyErrorKind,
        parent: FileType,
        tuple: &[String],
    ) -> Result<()> {
        if run.digests[parent.index()].mark_referenced(tuple).is_some()
            || self.in_previous_release(parent, tuple)
        {
            return Ok(());
        }
        run.report(at, kind, Some(parent), tuple)
    }

    fn in_previous_release(&self, file_type: FileType, key: &[String]) -> bool {
        self.oracle
            .is_some_and(|oracle| oracle.contains(self.dictionary.name(file_type), key))
    }

    /// Report every tuple of `tracker.parent` that `child` left uncovered,
    /// against the shard where the tuple first appeared.
    fn check_surjection(run: &mut Run<'_>, child: FileType, tracker: &Coverage) -> Result<()> {
        let digest = &run.digests[tracker.parent.index()];
        let errors = run.errors.file_mut(tracker.parent);
        let mut missing = 0usize;
        for (position, entry) in digest.entries().iter().enumerate() {
            if tracker.is_covered(position) {
                continue;
            }
            missing += 1;
            errors.report(
                entry.shard,
                SURJECTION_LINE_NUMBER,
                KVRowError::new(KeyErrorKind::Surjection, Some(child), entry.tuple.clone()),
            )?;
        }
        debug!(
            parent = %tracker.parent,
            unreferenced = missing,
            total = digest.len(),
            "surjection check complete"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Location {
    file_type: FileType,
    shard: usize,
    line: i64,
}

/// Parent tuples matched by one child type's mandatory bidirectional
/// relation, by digest position.
struct Coverage {
    parent: FileType,
    covered: Vec<bool>,
}

impl Coverage {
    fn new(parent: FileType, size: usize) -> Self {
        Self {
            parent,
            covered: vec![false; size],
        }
    }

    fn cover(&mut self, position: usize) {
        if let Some(slot) = self.covered.get_mut(position) {
            *slot = true;
        }
    }

    fn is_covered(&self, position: usize) -> bool {
        self.covered.get(position).copied().unwrap_or(false)
    }
}

struct Run<'a> {
    dictionary: &'a CompiledDictionary,
    phase: Phase,
    digests: Vec<Digest>,
    errors: KVSubmissionErrors,
    summaries: Vec<FileTypeSummary>,
}

impl<'a> Run<'a> {
    fn new(dictionary: &'a CompiledDictionary, tie_break: TieBreak) -> Result<Self> {
        Ok(Self {
            dictionary,
            phase: Phase::Init,
            digests: vec![Digest::new(); dictionary.len()],
            errors: KVSubmissionErrors::new(dictionary, tie_break)?,
            summaries: dictionary
                .file_types()
                .map(|file_type| FileTypeSummary {
                    name: dictionary.name(file_type).to_string(),
                    ..FileTypeSummary::default()
                })
                .collect(),
        })
    }

    fn transition(&mut self, next: Phase) {
        debug!(from = %self.phase, to = %next, "phase");
        self.phase = next;
    }

    fn report(
        &mut self,
        at: Location,
        kind: KeyErrorKind,
        related: Option<FileType>,
        values: &[String],
    ) -> Result<()> {
        self.errors.file_mut(at.file_type).report(
            at.shard,
            at.line,
            KVRowError::new(kind, related, values.to_vec()),
        )?;
        Ok(())
    }

    fn into_report(mut self) -> Result<KeyValidationReport> {
        let (valid, errors) = self.errors.describe(self.dictionary)?;
        for file_type in self.dictionary.file_types() {
            self.summaries[file_type.index()].errors = self.errors.file(file_type).len();
        }
        let file_types = self
            .dictionary
            .topological_order()
            .iter()
            .map(|file_type| self.summaries[file_type.index()].clone())
            .collect();
        info!(valid, errors = errors.len(), "key validation finished");
        Ok(KeyValidationReport {
            valid,
            errors,
            file_types,
        })
    }
}
