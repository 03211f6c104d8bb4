//! Lifecycle error taxonomy.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use dirgate_db::DbError;
use dirgate_directory::DirectoryError;
use dirgate_notify::NotificationError;
use dirgate_secrets::VaultError;

/// Coarse classification for callers that branch on failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connect,
    AlreadyExists,
    NotFound,
    Directory,
    Vault,
    Notification,
    Expired,
    Database,
    Validation,
}

/// Failure of a lifecycle operation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// The issued secret can no longer be delivered.
    #[error("issued secret {id} expired at {expired_at}")]
    Expired { id: i64, expired_at: DateTime<Utc> },

    /// A local record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] DbError),

    /// The directory accepted the change but the local mirror did not.
    /// The directory change is not rolled back.
    #[error("{operation} for '{uid}' was applied in the directory and kept, but the local record could not be written: {source}")]
    LocalWriteFailed {
        operation: &'static str,
        uid: String,
        #[source]
        source: DbError,
    },

    #[error("invalid request: {0}")]
    Validation(String),
}

/// Result alias for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

impl LifecycleError {
    pub(crate) fn local_write(operation: &'static str, uid: &str, source: impl Into<DbError>) -> Self {
        LifecycleError::LocalWriteFailed {
            operation,
            uid: uid.to_string(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Directory(e) => match e {
                DirectoryError::ConnectFailed { .. } | DirectoryError::AuthenticationFailed => {
                    ErrorKind::Connect
                }
                DirectoryError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
                DirectoryError::NotFound { .. } => ErrorKind::NotFound,
                DirectoryError::InvalidInput { .. } => ErrorKind::Validation,
                DirectoryError::OperationFailed { .. } => ErrorKind::Directory,
            },
            LifecycleError::Vault(_) => ErrorKind::Vault,
            LifecycleError::Notification(_) => ErrorKind::Notification,
            LifecycleError::Expired { .. } => ErrorKind::Expired,
            LifecycleError::NotFound(_) => ErrorKind::NotFound,
            LifecycleError::Database(_) | LifecycleError::LocalWriteFailed { .. } => {
                ErrorKind::Database
            }
            LifecycleError::Validation(_) => ErrorKind::Validation,
        }
    }
}

impl From<sqlx::Error> for LifecycleError {
    fn from(e: sqlx::Error) -> Self {
        LifecycleError::Database(DbError::QueryFailed(e))
    }
}
