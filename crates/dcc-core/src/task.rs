//! Validation tasks, their handles and outcomes.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError};

use dcc_ingest::RowSource;
use dcc_model::{CancelFlag, SubmissionState, ValidatorKind};
use dcc_validate::KeyValidationReport;

use crate::error::{Result, SchedulerError};
use crate::stage::StageOutcome;

/// Identifies one submission: a project within a release.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId {
    pub release: String,
    pub project: String,
}

impl TaskId {
    pub fn new(release: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            release: release.into(),
            project: project.into(),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.release, self.project)
    }
}

/// One submission waiting to be validated.
pub struct ValidationTask {
    id: TaskId,
    source: Box<dyn RowSource + Send>,
}

impl ValidationTask {
    pub fn new(id: TaskId, source: impl RowSource + Send + 'static) -> Self {
        Self {
            id,
            source: Box::new(source),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn source(&self) -> &dyn RowSource {
        &*self.source
    }
}

impl fmt::Debug for ValidationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationTask")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub validator: ValidatorKind,
    pub outcome: StageOutcome,
}

/// Final result of a task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub id: TaskId,
    pub state: SubmissionState,
    /// Stages that completed, in chain order.
    pub stages: Vec<StageReport>,
    pub key_report: Option<KeyValidationReport>,
    /// Set when `state` is [`SubmissionState::Error`].
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskOutcome {
    pub fn is_valid(&self) -> bool {
        self.state == SubmissionState::Valid
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Shared, observable state of a task.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<Mutex<SubmissionState>>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(SubmissionState::Queued)))
    }

    pub(crate) fn set(&self, state: SubmissionState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub(crate) fn get(&self) -> SubmissionState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Caller's side of a submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    cancel: CancelFlag,
    state: StateCell,
    outcome: Receiver<TaskOutcome>,
}

impl TaskHandle {
    pub(crate) fn new(
        id: TaskId,
        cancel: CancelFlag,
        state: StateCell,
        outcome: Receiver<TaskOutcome>,
    ) -> Self {
        Self {
            id,
            cancel,
            state,
            outcome,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Request cancellation. A running task stops at its next stage or
    /// file-type boundary; a queued one never starts.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> SubmissionState {
        self.state.get()
    }

    /// Block until the task finishes.
    pub fn wait(self) -> Result<TaskOutcome> {
        self.outcome
            .recv()
            .map_err(|_| SchedulerError::Disconnected {
                task: self.id.to_string(),
            })
    }

    /// Block for at most `timeout`; `None` if the task is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<TaskOutcome>> {
        match self.outcome.recv_timeout(timeout) {
            Ok(outcome) => Some(Ok(outcome)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(SchedulerError::Disconnected {
                task: self.id.to_string(),
            })),
        }
    }
}
