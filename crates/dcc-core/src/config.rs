//! Scheduler configuration.
//!
//! Loaded from TOML; every key is optional:
//!
//! ```toml
//! max_concurrent_validations = 2
//! validators = ["first_pass", "primary", "key"]
//! tie_break = "uniqueness_first"
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use dcc_model::{TieBreak, ValidatorKind};

use crate::error::{Result, SchedulerError};

pub const DEFAULT_MAX_CONCURRENT_VALIDATIONS: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Number of validation slots.
    pub max_concurrent_validations: usize,
    /// Validator chain, run in this order for every task.
    pub validators: Vec<ValidatorKind>,
    /// Which violation a row keeps when it breaks several key constraints.
    pub tie_break: TieBreak,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_validations: DEFAULT_MAX_CONCURRENT_VALIDATIONS,
            validators: ValidatorKind::DEFAULT_ORDER.to_vec(),
            tie_break: TieBreak::default(),
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn with_max_concurrent_validations(mut self, slots: usize) -> Self {
        self.max_concurrent_validations = slots;
        self
    }

    #[must_use]
    pub fn with_validators(mut self, validators: impl IntoIterator<Item = ValidatorKind>) -> Self {
        self.validators = validators.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|source| SchedulerError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SchedulerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text, path)?;
        info!(
            path = %path.display(),
            slots = config.max_concurrent_validations,
            validators = config.validators.len(),
            "loaded scheduler configuration"
        );
        Ok(config)
    }

    /// Reject configurations the scheduler cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_validations == 0 {
            return Err(SchedulerError::config(
                "max_concurrent_validations must be at least 1",
            ));
        }
        let mut seen = BTreeSet::new();
        for validator in &self.validators {
            if !seen.insert(*validator) {
                return Err(SchedulerError::config(format!(
                    "validator {validator} is listed more than once"
                )));
            }
        }
        let position = |kind: ValidatorKind| self.validators.iter().position(|v| *v == kind);
        if let (Some(key), Some(first_pass)) =
            (position(ValidatorKind::Key), position(ValidatorKind::FirstPass))
            && key < first_pass
        {
            return Err(SchedulerError::config(
                "key validation must run after first_pass",
            ));
        }
        Ok(())
    }

    pub fn runs(&self, kind: ValidatorKind) -> bool {
        self.validators.contains(&kind)
    }
}
