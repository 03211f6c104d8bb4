//! Error types for secret issuance and at-rest protection.

use thiserror::Error;

/// Errors from the envelope vault.
///
/// Every decryption-side failure collapses into `DecryptionFailed` so a
/// tampered record can never be told apart from a mis-keyed one.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No master secret is configured.
    #[error("vault master secret is not configured")]
    KeyUnavailable,

    /// Authentication tag mismatch, wrong key, or malformed ciphertext.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("encryption failed: {message}")]
    EncryptionFailed { message: String },

    /// Key derivation parameters rejected.
    #[error("invalid key derivation parameters: {message}")]
    InvalidParams { message: String },
}

/// Result alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Get an error code for classification.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            VaultError::KeyUnavailable => "KEY_UNAVAILABLE",
            VaultError::DecryptionFailed => "DECRYPTION_FAILED",
            VaultError::EncryptionFailed { .. } => "ENCRYPTION_FAILED",
            VaultError::InvalidParams { .. } => "INVALID_KDF_PARAMS",
        }
    }
}
