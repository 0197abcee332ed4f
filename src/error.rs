//! Error types for the work-context probe.

use thiserror::Error;

/// Errors raised by the ambient context machinery
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Invalid argument: {0} must not be null")]
    InvalidArgument(&'static str),

    #[error("No ambient scope: the current task was not entered through WorkContextAccessor")]
    NoAmbientScope,
}

/// Errors surfaced by a probe run
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Work unit panicked: {0}")]
    TaskPanicked(String),

    #[error("Admission gate closed")]
    GateClosed,
}

impl From<config::ConfigError> for ProbeError {
    fn from(err: config::ConfigError) -> Self {
        ProbeError::ConfigError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ProbeError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            let payload = err.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            ProbeError::TaskPanicked(message)
        } else {
            ProbeError::TaskPanicked(err.to_string())
        }
    }
}
