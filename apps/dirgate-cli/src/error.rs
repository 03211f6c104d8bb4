//! CLI error types and exit codes

use thiserror::Error;

use dirgate_db::DbError;
use dirgate_directory::DirectoryError;
use dirgate_identity::{ErrorKind, LifecycleError};
use dirgate_notify::{NotificationError, ProviderError};

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Configuration error
/// - 3: Directory unreachable
/// - 4: Invalid input, missing or conflicting record
/// - 5: Directory, vault, notification log or database failure
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("SMS provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for CliError {
    fn from(err: sqlx::Error) -> Self {
        CliError::Database(DbError::from(err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other(err.into())
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Lifecycle(e) => match e.kind() {
                ErrorKind::Connect => 3,
                ErrorKind::AlreadyExists
                | ErrorKind::NotFound
                | ErrorKind::Expired
                | ErrorKind::Validation => 4,
                ErrorKind::Directory
                | ErrorKind::Vault
                | ErrorKind::Notification
                | ErrorKind::Database => 5,
            },
            CliError::Directory(e) if e.is_connect_error() => 3,
            CliError::Directory(DirectoryError::InvalidInput { .. }) => 2,
            CliError::Directory(_) | CliError::Database(_) | CliError::Notification(_) => 5,
            CliError::NotFound(_) | CliError::Validation(_) => 4,
            CliError::Provider(ProviderError::Configuration(_)) => 2,
            CliError::Provider(_) | CliError::Other(_) => 1,
        }
    }

    /// Print the error to stderr.
    pub fn print(&self) {
        eprintln!("Error: {self}");
        if let CliError::Lifecycle(LifecycleError::LocalWriteFailed { .. }) = self {
            eprintln!("\nRun 'dirgate sync users' to reconcile the local mirror.");
        }
    }
}
