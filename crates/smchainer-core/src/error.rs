//! Error types for smchainer core.

use thiserror::Error;

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration file or override could not be applied.
    #[error("configuration error: {0}")]
    Config(String),

    /// The training environment on disk is missing or malformed.
    #[error("invalid training environment: {0}")]
    Environment(String),

    /// A hyperparameter has the wrong type or an out-of-range value.
    #[error("invalid hyperparameter `{key}`: {reason}")]
    Hyperparameter { key: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
