use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("file type name cannot be empty")]
    EmptyFileTypeName,
    #[error("unknown validator: {0}")]
    UnknownValidator(String),
    #[error("unknown tie-break policy: {0}")]
    UnknownTieBreak(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
