use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Invalid burst {0}: burst must be between 1 and {max} seconds", max = u32::MAX)]
    InvalidBurst(i64),

    #[error("Job name must not be empty")]
    EmptyCommand,

    #[error("Unknown scheduling policy: {0} (expected fcfs, sjf or priority)")]
    UnknownPolicy(String),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("Invalid benchmark: {0}")]
    InvalidBenchmark(String),

    #[error("Job queue is closed, no further jobs are accepted")]
    QueueClosed,

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BatchError {
    /// True for errors caused by a malformed request; the queue is left untouched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BatchError::InvalidBurst(_)
                | BatchError::EmptyCommand
                | BatchError::UnknownPolicy(_)
                | BatchError::Usage(_)
                | BatchError::InvalidBenchmark(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;
