//! Submission validation scheduling.
//!
//! [`ValidationScheduler`] runs one task per submission on a fixed number of
//! worker threads. Within a task the configured validators run in order;
//! key validation is performed by `dcc-validate`, the remaining stages by a
//! [`StageRunner`].

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod scheduler;
pub mod stage;
pub mod task;

pub use crate::config::{DEFAULT_MAX_CONCURRENT_VALIDATIONS, SchedulerConfig};
pub use crate::error::{Result, SchedulerError};
pub use crate::scheduler::{SchedulerBuilder, ValidationScheduler};
pub use crate::stage::{SkipStages, StageError, StageOutcome, StageRunner};
pub use crate::task::{StageReport, TaskHandle, TaskId, TaskOutcome, ValidationTask};
