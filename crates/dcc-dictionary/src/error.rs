use std::path::PathBuf;

use dcc_model::KeyErrorKind;

use crate::condition::ConditionError;

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("failed to read dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dictionary {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid file type name {name:?}")]
    InvalidName { name: String },

    #[error("duplicate file type: {name}")]
    DuplicateFileType { name: String },

    #[error("dictionary declares {count} file types, more than can be indexed")]
    TooManyFileTypes { count: usize },

    #[error("duplicate field {field} in {file_type}")]
    DuplicateField { file_type: String, field: String },

    #[error("{file_type} references unknown file type {other}")]
    UnknownFileType { file_type: String, other: String },

    #[error("unknown field {field} in {file_type}")]
    UnknownField { file_type: String, field: String },

    #[error("{file_type} references {other}, which declares no primary key")]
    NoPrimaryKey { file_type: String, other: String },

    #[error("invalid relation {file_type} -> {other}: {message}")]
    InvalidRelation {
        file_type: String,
        other: String,
        message: String,
    },

    #[error(
        "relation {file_type} -> {other} targets fields [{actual}], expected the primary key [{expected}]"
    )]
    RelationMismatch {
        file_type: String,
        other: String,
        expected: String,
        actual: String,
    },

    #[error("{file_type} declares more than one {kind} relation to {other}")]
    DuplicateRelation {
        file_type: String,
        other: String,
        kind: &'static str,
    },

    #[error("invalid condition on relation {file_type} -> {other}: {source}")]
    Condition {
        file_type: String,
        other: String,
        #[source]
        source: ConditionError,
    },

    #[error("cyclic dependency between file types: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("no field mapping registered for {kind} on {file_type} (referenced: {referenced})")]
    UnregisteredErrorFields {
        file_type: String,
        kind: KeyErrorKind,
        referenced: String,
    },
}

impl DictionaryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors caused by the dictionary's content rather than
    /// by reading it.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, DictionaryError>;
