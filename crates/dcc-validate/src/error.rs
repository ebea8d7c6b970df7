use dcc_dictionary::{DictionaryError, InvalidRowError};
use dcc_ingest::IngestError;
use dcc_model::KeyErrorKind;

/// Fatal key-validation errors.
///
/// Constraint violations are never returned through this type; they are
/// collected into the report instead.
#[derive(Debug, thiserror::Error)]
pub enum KeyValidationError {
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error("failed to read {file_type} data: {source}")]
    Io {
        file_type: String,
        #[source]
        source: IngestError,
    },

    #[error("{file} line {line}: expected {expected} fields, found {actual}")]
    MalformedRow {
        file: String,
        line: i64,
        expected: usize,
        actual: usize,
    },

    #[error("{file} line {line}: cannot evaluate condition: {source}")]
    InvalidRow {
        file: String,
        line: i64,
        #[source]
        source: InvalidRowError,
    },

    #[error("{kind} was reported for {file_type} (related: {related}) but never registered")]
    UnregisteredError {
        file_type: String,
        kind: KeyErrorKind,
        related: String,
    },

    #[error("key validation cancelled before {file_type}")]
    Cancelled { file_type: String },
}

impl KeyValidationError {
    pub fn io(file_type: impl Into<String>, source: IngestError) -> Self {
        Self::Io {
            file_type: file_type.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Errors caused by the dictionary rather than the submitted data.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::Dictionary(error) => error.is_configuration_error(),
            Self::UnregisteredError { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, KeyValidationError>;
