//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Args(#[from] clap::Error),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),

    #[error("{0} region file(s) could not be processed")]
    RegionsFailed(usize),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::Domain(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // help and version requests are not failures
            CliError::Args(e) if !e.use_stderr() => exitcode::OK,
            CliError::Args(_) | CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::RegionsFailed(_) => exitcode::DATAERR,
            CliError::Infra(InfraError::Application(app)) => application_exit_code(app),
        }
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::InvalidInput(_) => exitcode::NOINPUT,
        ApplicationError::Domain(DomainError::InputNotFound(_)) => exitcode::NOINPUT,
        ApplicationError::Domain(DomainError::OverlappingPaths { .. }) => exitcode::USAGE,
        ApplicationError::Domain(_) | ApplicationError::Region { .. } => exitcode::DATAERR,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::ThreadPool(_) => exitcode::OSERR,
        ApplicationError::OperationFailed { .. } => exitcode::IOERR,
    }
}
