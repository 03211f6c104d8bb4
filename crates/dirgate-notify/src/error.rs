//! Error types for SMS delivery.

use thiserror::Error;

/// Failure reported by an SMS provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The provider answered but could not be understood.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// The provider answered with its failure envelope.
    #[error("{message}")]
    Rejected {
        message: String,
        response: serde_json::Value,
    },

    #[error("{0}")]
    Unsupported(String),
}

impl ProviderError {
    pub(crate) fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(format!("{provider}: {err}"))
        } else {
            ProviderError::Connection(format!("Failed to connect to {provider}: {err}"))
        }
    }

    /// Provider payload attached to the error, if any.
    #[must_use]
    pub fn raw_response(&self) -> Option<&serde_json::Value> {
        match self {
            ProviderError::Rejected { response, .. } => Some(response),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }
}

/// Failure of the dispatch pipeline itself (not of the delivery).
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The delivery audit row could not be written.
    #[error("Failed to record notification: {0}")]
    Log(#[from] sqlx::Error),
}
