//! Type-safe enumerations for key validation.
//!
//! These enums name the violation kinds the key validator can record, the
//! external error types they are reported under, the validator stages a
//! submission goes through, and the states a submission moves between.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// Kind of key violation.
///
/// Uniqueness and relation kinds are recorded against a data row; a
/// surjection violation is recorded against a parent tuple that no child
/// row referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyErrorKind {
    /// Primary key repeated within the current submission.
    ExistingUnique,
    /// Primary key already accepted in a previous release.
    IncrementalUnique,
    /// First mandatory foreign key has no matching parent tuple.
    Relation,
    /// A later mandatory foreign key has no matching parent tuple.
    SecondaryRelation,
    /// Optional foreign key present but unmatched.
    OptionalRelation,
    /// Conditional foreign key active for the row but unmatched.
    ConditionalRelation,
    /// Parent tuple never referenced by a child under a bidirectional relation.
    Surjection,
}

impl KeyErrorKind {
    pub const ALL: [KeyErrorKind; 7] = [
        KeyErrorKind::ExistingUnique,
        KeyErrorKind::IncrementalUnique,
        KeyErrorKind::Relation,
        KeyErrorKind::SecondaryRelation,
        KeyErrorKind::OptionalRelation,
        KeyErrorKind::ConditionalRelation,
        KeyErrorKind::Surjection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyErrorKind::ExistingUnique => "EXISTING_UNIQUE",
            KeyErrorKind::IncrementalUnique => "INCREMENTAL_UNIQUE",
            KeyErrorKind::Relation => "RELATION",
            KeyErrorKind::SecondaryRelation => "SECONDARY_RELATION",
            KeyErrorKind::OptionalRelation => "OPTIONAL_RELATION",
            KeyErrorKind::ConditionalRelation => "CONDITIONAL_RELATION",
            KeyErrorKind::Surjection => "SURJECTION",
        }
    }

    /// External error type this kind is reported under.
    pub fn error_type(&self) -> ErrorType {
        match self {
            KeyErrorKind::ExistingUnique | KeyErrorKind::IncrementalUnique => {
                ErrorType::UniqueValueError
            }
            KeyErrorKind::Relation
            | KeyErrorKind::SecondaryRelation
            | KeyErrorKind::OptionalRelation
            | KeyErrorKind::ConditionalRelation => ErrorType::RelationValueError,
            KeyErrorKind::Surjection => ErrorType::RelationParentValueError,
        }
    }

    pub fn is_uniqueness(&self) -> bool {
        matches!(
            self,
            KeyErrorKind::ExistingUnique | KeyErrorKind::IncrementalUnique
        )
    }

    /// Returns true for kinds that point from a child row to a parent type.
    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            KeyErrorKind::Relation
                | KeyErrorKind::SecondaryRelation
                | KeyErrorKind::OptionalRelation
                | KeyErrorKind::ConditionalRelation
        )
    }
}

impl fmt::Display for KeyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type as consumed by the submission reporting subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    UniqueValueError,
    RelationValueError,
    RelationParentValueError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::UniqueValueError => "UNIQUE_VALUE_ERROR",
            ErrorType::RelationValueError => "RELATION_VALUE_ERROR",
            ErrorType::RelationParentValueError => "RELATION_PARENT_VALUE_ERROR",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which violation is kept when one row breaks several key constraints.
///
/// Only one violation is recorded per (file, line).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Uniqueness violations win over relation violations.
    #[default]
    UniquenessFirst,
    /// The first relation violation wins over a uniqueness violation.
    RelationFirst,
}

impl FromStr for TieBreak {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "uniqueness_first" => Ok(TieBreak::UniquenessFirst),
            "relation_first" => Ok(TieBreak::RelationFirst),
            _ => Err(ModelError::UnknownTieBreak(s.to_string())),
        }
    }
}

/// A validator stage in a submission's validation chain.
///
/// The scheduler runs stages in the explicit order given by its
/// configuration; [`ValidatorKind::DEFAULT_ORDER`] is the standard chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Structural checks (headers, field counts, encodings).
    FirstPass,
    /// Per-field restrictions.
    Primary,
    /// Primary/foreign key and surjection checks.
    Key,
    Pcawg,
    ReferenceGenome,
    SampleType,
    Normalization,
    Accession,
}

impl ValidatorKind {
    pub const DEFAULT_ORDER: [ValidatorKind; 8] = [
        ValidatorKind::FirstPass,
        ValidatorKind::Primary,
        ValidatorKind::Key,
        ValidatorKind::Pcawg,
        ValidatorKind::ReferenceGenome,
        ValidatorKind::SampleType,
        ValidatorKind::Normalization,
        ValidatorKind::Accession,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorKind::FirstPass => "first_pass",
            ValidatorKind::Primary => "primary",
            ValidatorKind::Key => "key",
            ValidatorKind::Pcawg => "pcawg",
            ValidatorKind::ReferenceGenome => "reference_genome",
            ValidatorKind::SampleType => "sample_type",
            ValidatorKind::Normalization => "normalization",
            ValidatorKind::Accession => "accession",
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidatorKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ValidatorKind::DEFAULT_ORDER
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownValidator(s.to_string()))
    }
}

/// Lifecycle state of one submission validation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    Queued,
    Validating,
    /// Every configured validator passed with zero violations.
    Valid,
    /// Validation completed and recorded at least one violation.
    Invalid,
    /// A fatal error stopped validation; the submission must be re-submitted.
    Error,
    Cancelled,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionState::Queued | SubmissionState::Validating)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionState::Queued => "QUEUED",
            SubmissionState::Validating => "VALIDATING",
            SubmissionState::Valid => "VALID",
            SubmissionState::Invalid => "INVALID",
            SubmissionState::Error => "ERROR",
            SubmissionState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
