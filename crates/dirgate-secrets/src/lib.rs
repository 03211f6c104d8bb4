//! # dirgate secrets
//!
//! Strong secret issuance and at-rest protection for issued secrets.
//!
//! - [`issuer`]: CSPRNG generation and strength scoring.
//! - [`vault`]: Argon2id-derived KEK wrapping a per-record AES-256-GCM DEK.

pub mod error;
pub mod issuer;
pub mod secret;
pub mod vault;

pub use error::{VaultError, VaultResult};
pub use issuer::{generate, strength, SecretIssuer, StrengthLabel, StrengthReport};
pub use secret::{SecretValue, MASKED_SECRET};
pub use vault::{EnvelopeVault, KdfParams, SealedSecret};
