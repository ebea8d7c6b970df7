use std::path::PathBuf;

use dcc_validate::KeyValidationReport;

/// What `dcc-keys validate` prints.
#[derive(Debug)]
pub struct ValidateResult {
    pub report: KeyValidationReport,
    pub report_path: PathBuf,
    pub fingerprint: String,
}
