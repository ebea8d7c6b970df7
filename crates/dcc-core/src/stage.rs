//! Validator stages other than key validation.
//!
//! Key validation runs in-process. Every other stage of the chain is
//! delegated to a [`StageRunner`] supplied by the embedding system.

use tracing::info;

use dcc_ingest::RowSource;
use dcc_model::ValidatorKind;

use crate::task::TaskId;

/// Result of one completed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Passed,
    /// The stage completed and recorded violations.
    Failed { errors: usize },
    /// No runner is configured for the stage.
    Skipped,
}

impl StageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// A stage that could not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("{stage} stage cancelled")]
    Cancelled { stage: ValidatorKind },

    #[error("{stage} stage failed: {message}")]
    Failed {
        stage: ValidatorKind,
        message: String,
    },
}

impl StageError {
    pub fn failed(stage: ValidatorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            message: message.into(),
        }
    }
}

/// Runs the non-key stages of a validation chain.
pub trait StageRunner: Send + Sync {
    fn run(
        &self,
        stage: ValidatorKind,
        task: &TaskId,
        source: &dyn RowSource,
    ) -> Result<StageOutcome, StageError>;
}

/// Runner used when the embedding system provides none: every stage is
/// skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipStages;

impl StageRunner for SkipStages {
    fn run(
        &self,
        stage: ValidatorKind,
        task: &TaskId,
        _source: &dyn RowSource,
    ) -> Result<StageOutcome, StageError> {
        info!(%stage, %task, "no runner configured, skipping stage");
        Ok(StageOutcome::Skipped)
    }
}
