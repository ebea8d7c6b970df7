//! Key validation report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dcc_dictionary::hash::sha256_hex;
use dcc_model::{ErrorRecord, KeyErrorKind};

/// Conventional file name of the serialized report.
pub const REPORT_FILE_NAME: &str = "all.keys--errors.json";

/// Per-file-type statistics of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTypeSummary {
    pub name: String,
    pub files: usize,
    pub rows: u64,
    pub distinct_keys: usize,
    pub duplicates: u64,
    pub errors: usize,
}

/// Outcome of one key validation run: the verdict plus every violation in
/// dependency order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValidationReport {
    pub valid: bool,
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub file_types: Vec<FileTypeSummary>,
}

impl KeyValidationReport {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn counts_by_kind(&self) -> BTreeMap<KeyErrorKind, usize> {
        let mut counts = BTreeMap::new();
        for error in &self.errors {
            *counts.entry(error.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn errors_of(&self, kind: KeyErrorKind) -> impl Iterator<Item = &ErrorRecord> + '_ {
        self.errors.iter().filter(move |error| error.kind == kind)
    }

    pub fn summary(&self, file_type: &str) -> Option<&FileTypeSummary> {
        self.file_types.iter().find(|summary| summary.name == file_type)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// SHA-256 of the JSON rendering; equal for identical runs.
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        Ok(sha256_hex(self.to_json()?))
    }
}
