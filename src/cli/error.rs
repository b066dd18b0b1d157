//! CLI-level errors (wraps infrastructure errors)

use std::io;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(InfraError::Io { source, .. }) => io_exit_code(source),
            CliError::Infra(InfraError::Application(e)) => match e {
                ApplicationError::Domain(_)
                | ApplicationError::UnsupportedFormat(_)
                | ApplicationError::InvalidScript { .. } => exitcode::DATAERR,
                ApplicationError::Config { .. } => exitcode::CONFIG,
                ApplicationError::Selection { .. } => exitcode::SOFTWARE,
                ApplicationError::OperationFailed { source, .. } => source
                    .downcast_ref::<io::Error>()
                    .map(io_exit_code)
                    .unwrap_or(exitcode::DATAERR),
            },
        }
    }
}

fn io_exit_code(e: &io::Error) -> i32 {
    match e.kind() {
        io::ErrorKind::NotFound => exitcode::NOINPUT,
        _ => exitcode::IOERR,
    }
}
