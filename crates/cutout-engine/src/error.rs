//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while calling the background-removal engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Removal failed: {0}")]
    RemovalFailed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn removal_failed(msg: impl Into<String>) -> Self {
        Self::RemovalFailed(msg.into())
    }
}
