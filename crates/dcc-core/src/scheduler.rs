//! Bounded validation pool.
//!
//! A fixed set of worker threads, one per validation slot, pulls tasks from
//! a shared queue. Each task runs the configured validator chain in order;
//! the chain stops at the first stage that records violations, fails or is
//! cancelled.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info, info_span, warn};

use dcc_dictionary::CompiledDictionary;
use dcc_model::{CancelFlag, SubmissionState, TieBreak, ValidatorKind};
use dcc_validate::{KeyValidationReport, PreviousReleaseOracle, ReferentialValidator};

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::stage::{SkipStages, StageError, StageOutcome, StageRunner};
use crate::task::{StageReport, StateCell, TaskHandle, TaskOutcome, ValidationTask};

/// Everything workers share, read-only.
struct Shared {
    dictionary: Arc<CompiledDictionary>,
    oracle: Option<Arc<dyn PreviousReleaseOracle>>,
    stages: Arc<dyn StageRunner>,
    validators: Vec<ValidatorKind>,
    tie_break: TieBreak,
}

#[derive(Default)]
struct Counters {
    /// Tasks currently executing.
    active: AtomicUsize,
    /// Tasks accepted and not yet finished, queued ones included.
    in_flight: AtomicUsize,
}

struct Job {
    task: ValidationTask,
    cancel: CancelFlag,
    state: StateCell,
    reply: Sender<TaskOutcome>,
}

pub struct SchedulerBuilder {
    config: SchedulerConfig,
    dictionary: Arc<CompiledDictionary>,
    oracle: Option<Arc<dyn PreviousReleaseOracle>>,
    stages: Arc<dyn StageRunner>,
}

impl SchedulerBuilder {
    /// Previous-release keys, shared read-only by every task.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn PreviousReleaseOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    #[must_use]
    pub fn with_stages(mut self, stages: Arc<dyn StageRunner>) -> Self {
        self.stages = stages;
        self
    }

    /// Validate the configuration and spawn the worker threads.
    pub fn start(self) -> Result<ValidationScheduler> {
        self.config.validate()?;
        let slots = self.config.max_concurrent_validations;
        let shared = Arc::new(Shared {
            dictionary: self.dictionary,
            oracle: self.oracle,
            stages: self.stages,
            validators: self.config.validators,
            tie_break: self.config.tie_break,
        });
        let counters = Arc::new(Counters::default());
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();

        let mut workers = Vec::with_capacity(slots);
        for slot in 0..slots {
            let name = format!("validation-slot-{slot}");
            let receiver = receiver.clone();
            let shared = Arc::clone(&shared);
            let counters = Arc::clone(&counters);
            let worker = std::thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&receiver, &shared, &counters))
                .map_err(|source| SchedulerError::Spawn { name, source })?;
            workers.push(worker);
        }
        info!(slots, "validation scheduler started");

        Ok(ValidationScheduler {
            slots,
            sender: Some(sender),
            workers,
            counters,
        })
    }
}

/// Runs validation tasks on at most `max_concurrent_validations` threads.
///
/// Dropping the scheduler finishes every accepted task before returning.
pub struct ValidationScheduler {
    slots: usize,
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for ValidationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationScheduler")
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl ValidationScheduler {
    pub fn builder(config: SchedulerConfig, dictionary: Arc<CompiledDictionary>) -> SchedulerBuilder {
        SchedulerBuilder {
            config,
            dictionary,
            oracle: None,
            stages: Arc::new(SkipStages),
        }
    }

    pub fn start(config: SchedulerConfig, dictionary: Arc<CompiledDictionary>) -> Result<Self> {
        Self::builder(config, dictionary).start()
    }

    pub fn capacity(&self) -> usize {
        self.slots
    }

    /// Number of tasks currently executing.
    pub fn active_count(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Number of accepted tasks that have not finished.
    pub fn pending_count(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Queue a task; it starts as soon as a slot frees up.
    pub fn submit(&self, task: ValidationTask) -> Result<TaskHandle> {
        self.counters.in_flight.fetch_add(1, Ordering::SeqCst);
        self.enqueue(task)
    }

    /// Start a task only if a slot is free right now.
    pub fn try_submit(&self, task: ValidationTask) -> Result<TaskHandle> {
        let slots = self.slots;
        let accepted = self
            .counters
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                (count < slots).then_some(count + 1)
            });
        if accepted.is_err() {
            let error = SchedulerError::Rejected { limit: slots };
            warn!(task = %task.id(), "{error}");
            return Err(error);
        }
        self.enqueue(task)
    }

    fn enqueue(&self, task: ValidationTask) -> Result<TaskHandle> {
        let Some(sender) = &self.sender else {
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(SchedulerError::ShutDown);
        };
        let (reply, outcome) = crossbeam_channel::bounded(1);
        let cancel = CancelFlag::new();
        let state = StateCell::new();
        let handle = TaskHandle::new(task.id().clone(), cancel.clone(), state.clone(), outcome);
        info!(task = %task.id(), active = self.active_count(), "submitting validation");
        let job = Job {
            task,
            cancel,
            state,
            reply,
        };
        if sender.send(job).is_err() {
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(SchedulerError::ShutDown);
        }
        Ok(handle)
    }

    /// Stop accepting tasks, finish the accepted ones and join all workers.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        info!(pending = self.pending_count(), "shutting down validation scheduler");
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().unwrap_or("validation-slot").to_string();
            if worker.join().is_err() {
                error!(worker = %name, "validation worker panicked");
            }
        }
    }
}

impl Drop for ValidationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(receiver: &Receiver<Job>, shared: &Shared, counters: &Counters) {
    while let Ok(job) = receiver.recv() {
        counters.active.fetch_add(1, Ordering::SeqCst);
        let started_at = Utc::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| run_task(shared, &job)))
            .unwrap_or_else(|_| {
                error!(task = %job.task.id(), "validation panicked");
                TaskOutcome {
                    id: job.task.id().clone(),
                    state: SubmissionState::Error,
                    stages: Vec::new(),
                    key_report: None,
                    error: Some("validation panicked".to_string()),
                    started_at,
                    finished_at: Utc::now(),
                }
            });
        job.state.set(outcome.state);
        counters.active.fetch_sub(1, Ordering::SeqCst);
        counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        // The caller may have dropped its handle.
        let _ = job.reply.send(outcome);
    }
}

fn run_task(shared: &Shared, job: &Job) -> TaskOutcome {
    let id = job.task.id();
    let span = info_span!("validation", task = %id);
    let _guard = span.enter();
    let started_at = Utc::now();
    job.state.set(SubmissionState::Validating);
    info!("validation started");

    let mut stages = Vec::new();
    let mut key_report = None;
    let mut state = SubmissionState::Valid;
    let mut error = None;

    for &validator in &shared.validators {
        if job.cancel.is_cancelled() {
            state = SubmissionState::Cancelled;
            break;
        }
        let result = match validator {
            ValidatorKind::Key => run_key_stage(shared, job).map(|report| {
                let outcome = if report.valid {
                    StageOutcome::Passed
                } else {
                    StageOutcome::Failed {
                        errors: report.error_count(),
                    }
                };
                key_report = Some(report);
                outcome
            }),
            _ => shared.stages.run(validator, id, job.task.source()),
        };
        match result {
            Ok(outcome) => {
                let failed = outcome.is_failure();
                info!(%validator, ?outcome, "stage finished");
                stages.push(StageReport { validator, outcome });
                if failed {
                    state = SubmissionState::Invalid;
                    break;
                }
            }
            Err(StageError::Cancelled { .. }) => {
                state = SubmissionState::Cancelled;
                break;
            }
            Err(stage_error) => {
                warn!(%validator, error = %stage_error, "stage could not complete");
                state = SubmissionState::Error;
                error = Some(stage_error.to_string());
                break;
            }
        }
    }

    info!(%state, "validation finished");
    TaskOutcome {
        id: id.clone(),
        state,
        stages,
        key_report,
        error,
        started_at,
        finished_at: Utc::now(),
    }
}

fn run_key_stage(shared: &Shared, job: &Job) -> std::result::Result<KeyValidationReport, StageError> {
    let mut validator = ReferentialValidator::new(&shared.dictionary)
        .with_tie_break(shared.tie_break)
        .with_cancel_flag(job.cancel.clone());
    if let Some(oracle) = shared.oracle.as_deref() {
        validator = validator.with_oracle(oracle);
    }
    validator.validate(job.task.source()).map_err(|error| {
        if error.is_cancelled() {
            StageError::Cancelled {
                stage: ValidatorKind::Key,
            }
        } else {
            StageError::failed(ValidatorKind::Key, error.to_string())
        }
    })
}
