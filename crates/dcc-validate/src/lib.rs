//! Key validation engine.
//!
//! Checks primary-key uniqueness, foreign-key integrity and parent coverage
//! across the file types of one submission, following the dependency order
//! of a compiled dictionary.

#![deny(unsafe_code)]

pub mod digest;
pub mod error;
pub mod errors;
pub mod extract;
pub mod oracle;
pub mod processor;
pub mod report;

pub use crate::digest::{Digest, DigestEntry, Insertion};
pub use crate::error::{KeyValidationError, Result};
pub use crate::errors::{KVFileErrors, KVRowError, KVSubmissionErrors};
pub use crate::extract::{KVRow, KeyTuple, RowKeyExtractor, is_not_applicable};
pub use crate::oracle::{InMemoryOracle, PreviousReleaseOracle};
pub use crate::processor::{PROGRESS_INTERVAL, ReferentialValidator};
pub use crate::report::{FileTypeSummary, KeyValidationReport, REPORT_FILE_NAME};
