//! Error types for the is-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Failed to read protocol file: {path}")]
    ProtocolFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Protocol validation failed: {0}")]
    Validation(String),

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for is-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<is_project::ProjectError> for AppError {
    fn from(err: is_project::ProjectError) -> Self {
        match err {
            is_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Protocol(other.to_string()),
        }
    }
}

impl From<is_project::ValidationError> for AppError {
    fn from(err: is_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<is_stim::StimError> for AppError {
    fn from(err: is_stim::StimError) -> Self {
        AppError::Generator(err.to_string())
    }
}

impl From<is_results::ResultsError> for AppError {
    fn from(err: is_results::ResultsError) -> Self {
        match err {
            is_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
