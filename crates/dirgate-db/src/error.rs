//! Error types for the dirgate-db crate.

use thiserror::Error;

/// Database failures, tagged with the step that failed.
///
/// Model methods return `sqlx::Error` directly; this type is used at the
/// pool, migration and service edges.
#[derive(Debug, Error)]
pub enum DbError {
    /// Opening the database or acquiring a connection failed.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// A row the caller relies on is missing.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        DbError::QueryFailed(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = DbError::NotFound("directory user jdoe".to_string());
        assert_eq!(err.to_string(), "Not found: directory user jdoe");
    }

    #[test]
    fn test_from_sqlx_is_query_failure() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::QueryFailed(_)));
        assert!(err.to_string().starts_with("Query failed"));
    }
}
