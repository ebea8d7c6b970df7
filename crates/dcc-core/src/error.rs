use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid scheduler configuration: {message}")]
    Config { message: String },

    #[error("failed to read scheduler configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scheduler configuration {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Pool limit of {limit} concurrent validations reached. Validation rejected.")]
    Rejected { limit: usize },

    #[error("scheduler has been shut down")]
    ShutDown,

    #[error("failed to start worker thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("validation task {task} ended without an outcome")]
    Disconnected { task: String },
}

impl SchedulerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the task may be submitted again later.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
