//! Ingest error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("submission directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("invalid file pattern for {file_type}: {source}")]
    Pattern {
        file_type: String,
        #[source]
        source: regex::Error,
    },

    #[error("file {file_name} matches both {first} and {second}")]
    AmbiguousFile {
        file_name: String,
        first: String,
        second: String,
    },

    #[error("no file {file_name} for {file_type}")]
    UnknownFile {
        file_type: String,
        file_name: String,
    },
}

pub type Result<T> = std::result::Result<T, IngestError>;
