use smchainer_core::CoreError;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("cannot elect a master node from an empty host set")]
    EmptyHostSet,

    #[error("timed out after {waited:?} during {phase}; still pending: {}", pending.join(", "))]
    CoordinationTimeout { phase: String, pending: Vec<String>, waited: Duration },

    #[error("{program} failed with {status}")]
    ChildProcessFailure { program: String, status: ExitStatus },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrainingError {
    /// Exit code of the failed child process, when that is what went wrong.
    #[must_use]
    pub fn child_exit_code(&self) -> Option<i32> {
        match self {
            Self::ChildProcessFailure { status, .. } => status.code(),
            _ => None,
        }
    }
}
