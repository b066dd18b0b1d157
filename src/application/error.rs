//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("unsupported graph format: {0} (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("invalid session script {path}: {message}")]
    InvalidScript { path: PathBuf, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("selection failed: {message}")]
    Selection { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
