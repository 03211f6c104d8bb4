//! Directory gateway error types
//!
//! Errors are split into connect-level failures (transport or bind) and
//! object-state conflicts reported by the directory itself.

use thiserror::Error;

/// LDAP result code: invalid credentials.
pub const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: entry already exists.
pub const RC_ALREADY_EXISTS: u32 = 68;
/// LDAP result code: no such object.
pub const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code: attribute or value exists.
pub const RC_ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
/// LDAP result code: no such attribute.
pub const RC_NO_SUCH_ATTRIBUTE: u32 = 16;

/// Error that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Failed to reach the directory or bind to it.
    #[error("cannot connect to directory: {message}")]
    ConnectFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Bind identity rejected by the directory.
    #[error("directory authentication failed: invalid bind credentials")]
    AuthenticationFailed,

    /// Target entry already exists.
    #[error("entry already exists: {dn}")]
    AlreadyExists { dn: String },

    /// Target entry does not exist.
    #[error("entry not found: {dn}")]
    NotFound { dn: String },

    /// Any other directory-reported failure; carries the directory's own text.
    #[error("directory operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rejected before reaching the directory.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

/// Result alias for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl DirectoryError {
    /// Whether the directory could not be reached or the bind was refused.
    #[must_use]
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectFailed { .. } | DirectoryError::AuthenticationFailed
        )
    }

    /// Get an error code for classification.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::ConnectFailed { .. } => "CONNECT_FAILED",
            DirectoryError::AuthenticationFailed => "AUTH_FAILED",
            DirectoryError::AlreadyExists { .. } => "ALREADY_EXISTS",
            DirectoryError::NotFound { .. } => "NOT_FOUND",
            DirectoryError::OperationFailed { .. } => "OPERATION_FAILED",
            DirectoryError::InvalidInput { .. } => "INVALID_INPUT",
        }
    }

    /// Create a connect failed error.
    pub fn connect_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connect failed error with source.
    pub fn connect_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        DirectoryError::InvalidInput {
            message: message.into(),
        }
    }

    /// Map a non-zero LDAP result code for `dn` to the matching variant.
    #[must_use]
    pub fn from_result_code(rc: u32, text: &str, operation: &str, dn: &str) -> Self {
        match rc {
            RC_ALREADY_EXISTS => DirectoryError::AlreadyExists { dn: dn.to_string() },
            RC_NO_SUCH_OBJECT => DirectoryError::NotFound { dn: dn.to_string() },
            RC_INVALID_CREDENTIALS => DirectoryError::AuthenticationFailed,
            _ => DirectoryError::operation_failed(format!(
                "LDAP {operation} failed with code {rc}: {text}"
            )),
        }
    }
}
