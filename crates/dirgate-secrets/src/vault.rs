//! Envelope encryption for issued secrets.
//!
//! Key hierarchy: master secret → Argon2id → KEK (per record, random salt)
//! → wraps a random per-record DEK → DEK encrypts the payload.
//!
//! Both layers use AES-256-GCM with a fresh 96-bit nonce per call. Every
//! ciphertext is `nonce || ciphertext || tag`, URL-safe base64 encoded.

use aes_gcm::{
    aead::{Aead, OsRng},
    AeadCore, Aes256Gcm, KeyInit, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{VaultError, VaultResult};
use crate::secret::SecretValue;

/// Length of AES-256 keys in bytes.
pub const KEY_LENGTH: usize = 32;

/// Length of GCM nonce in bytes.
const NONCE_LENGTH: usize = 12;

/// Length of GCM authentication tag in bytes.
const TAG_LENGTH: usize = 16;

/// Length of the random KDF salt in bytes.
pub const SALT_LENGTH: usize = 16;

/// Environment variable holding the master secret.
pub const MASTER_SECRET_ENV: &str = "VAULT_MASTER_SECRET";

/// Argon2id cost parameters, stored next to every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Upper bounds accepted for stored cost parameters (256 MiB, 16 passes, 8 lanes).
pub const MAX_KDF_MEMORY_KIB: u32 = 256 * 1024;
pub const MAX_KDF_ITERATIONS: u32 = 16;
pub const MAX_KDF_PARALLELISM: u32 = 8;

impl KdfParams {
    /// Reject parameters outside the accepted bounds.
    pub fn check_bounds(&self) -> VaultResult<()> {
        if self.memory_kib > MAX_KDF_MEMORY_KIB
            || self.iterations > MAX_KDF_ITERATIONS
            || self.parallelism > MAX_KDF_PARALLELISM
        {
            return Err(VaultError::InvalidParams {
                message: format!("{self} exceeds the accepted cost bounds"),
            });
        }
        Ok(())
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl std::fmt::Display for KdfParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "argon2id$m={},t={},p={}",
            self.memory_kib, self.iterations, self.parallelism
        )
    }
}

impl std::str::FromStr for KdfParams {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VaultError::InvalidParams {
            message: format!("unrecognized KDF descriptor: {s}"),
        };

        let rest = s.strip_prefix("argon2id$").ok_or_else(invalid)?;
        let mut memory_kib = None;
        let mut iterations = None;
        let mut parallelism = None;

        for part in rest.split(',') {
            let (key, value) = part.split_once('=').ok_or_else(invalid)?;
            let value: u32 = value.parse().map_err(|_| invalid())?;
            match key {
                "m" => memory_kib = Some(value),
                "t" => iterations = Some(value),
                "p" => parallelism = Some(value),
                _ => return Err(invalid()),
            }
        }

        let params = Self {
            memory_kib: memory_kib.ok_or_else(invalid)?,
            iterations: iterations.ok_or_else(invalid)?,
            parallelism: parallelism.ok_or_else(invalid)?,
        };
        params.check_bounds()?;
        Ok(params)
    }
}

/// Key-encryption key. Scrubbed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Kek([u8; KEY_LENGTH]);

/// Data-encryption key. Scrubbed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Dek([u8; KEY_LENGTH]);

impl Dek {
    /// Fresh random DEK from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }
}

impl std::fmt::Debug for Kek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Kek([REDACTED])")
    }
}

impl std::fmt::Debug for Dek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Dek([REDACTED])")
    }
}

/// Derive a KEK from the master secret with Argon2id.
///
/// Parameters above the accepted bounds are rejected before any memory is
/// allocated, since records carry their own parameters.
pub fn derive_key(master_secret: &[u8], salt: &[u8], params: &KdfParams) -> VaultResult<Kek> {
    params.check_bounds()?;
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LENGTH),
    )
    .map_err(|e| VaultError::InvalidParams {
        message: e.to_string(),
    })?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(master_secret, salt, &mut key)
        .map_err(|e| VaultError::InvalidParams {
            message: e.to_string(),
        })?;
    Ok(Kek(key))
}

/// Wrap a DEK under a KEK.
pub fn wrap(kek: &Kek, dek: &Dek) -> VaultResult<String> {
    seal_bytes(&kek.0, &dek.0)
}

/// Unwrap a DEK. Any failure is `DecryptionFailed`.
pub fn unwrap(kek: &Kek, wrapped: &str) -> VaultResult<Dek> {
    let mut plain = open_bytes(&kek.0, wrapped)?;
    if plain.len() != KEY_LENGTH {
        plain.zeroize();
        return Err(VaultError::DecryptionFailed);
    }
    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(&plain);
    plain.zeroize();
    Ok(Dek(key))
}

/// Encrypt a payload under a DEK.
pub fn encrypt_payload(dek: &Dek, plaintext: &str) -> VaultResult<String> {
    seal_bytes(&dek.0, plaintext.as_bytes())
}

/// Decrypt a payload. Any failure is `DecryptionFailed`.
pub fn decrypt_payload(dek: &Dek, ciphertext: &str) -> VaultResult<SecretValue> {
    let plain = open_bytes(&dek.0, ciphertext)?;
    String::from_utf8(plain)
        .map(SecretValue::new)
        .map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            VaultError::DecryptionFailed
        })
}

#[allow(deprecated)] // aes-gcm 0.10 uses generic-array 0.x internally
fn seal_bytes(key: &[u8; KEY_LENGTH], plaintext: &[u8]) -> VaultResult<String> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| VaultError::EncryptionFailed {
        message: format!("failed to create cipher: {e}"),
    })?;

    // SECURITY: fresh random nonce for every encryption under a key
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext =
        cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| VaultError::EncryptionFailed {
                message: format!("encryption failed: {e}"),
            })?;

    let mut out = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(out))
}

#[allow(deprecated)] // aes-gcm 0.10 uses generic-array 0.x internally
fn open_bytes(key: &[u8; KEY_LENGTH], encoded: &str) -> VaultResult<Vec<u8>> {
    let data = decode(encoded)?;
    if data.len() < NONCE_LENGTH + TAG_LENGTH {
        return Err(VaultError::DecryptionFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| VaultError::DecryptionFailed)?;
    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LENGTH);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| VaultError::DecryptionFailed)
}

/// Padded and unpadded URL-safe base64 are both accepted.
fn decode(encoded: &str) -> VaultResult<Vec<u8>> {
    let trimmed = encoded.trim();
    let result = if trimmed.ends_with('=') {
        URL_SAFE.decode(trimmed)
    } else {
        URL_SAFE_NO_PAD.decode(trimmed)
    };
    result.map_err(|_| VaultError::DecryptionFailed)
}

/// Persisted form of an envelope-encrypted secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedSecret {
    /// Payload encrypted under the DEK.
    pub ciphertext: String,
    /// DEK encrypted under the KEK.
    pub wrapped_dek: String,
    /// Base64 KDF salt.
    pub salt: String,
    pub kdf: KdfParams,
}

/// Master secret bytes. Scrubbed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct MasterSecret(Vec<u8>);

/// At-rest protection for issued secrets.
///
/// A vault without a master secret is disabled: `seal` and `open` both
/// return `KeyUnavailable`.
#[derive(Clone)]
pub struct EnvelopeVault {
    master: Option<MasterSecret>,
    kdf: KdfParams,
}

impl EnvelopeVault {
    /// Vault keyed by `master_secret` with default cost parameters.
    pub fn new(master_secret: impl AsRef<[u8]>) -> Self {
        Self {
            master: Some(MasterSecret(master_secret.as_ref().to_vec())),
            kdf: KdfParams::default(),
        }
    }

    /// Vault with no key.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            master: None,
            kdf: KdfParams::default(),
        }
    }

    /// Read the master secret from `VAULT_MASTER_SECRET`; disabled when unset or empty.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(MASTER_SECRET_ENV) {
            Ok(mut value) if !value.is_empty() => {
                let vault = Self::new(value.as_bytes());
                // Scrub the env var copy
                value.zeroize();
                vault
            }
            _ => {
                warn!(
                    var = MASTER_SECRET_ENV,
                    "Vault master secret not set; issued secrets will not be stored"
                );
                Self::disabled()
            }
        }
    }

    /// Override cost parameters for new records.
    #[must_use]
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.master.is_some()
    }

    /// Cost parameters used for new records.
    #[must_use]
    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// Encrypt `plaintext` under a fresh DEK wrapped by a freshly salted KEK.
    pub fn seal(&self, plaintext: &str) -> VaultResult<SealedSecret> {
        let master = self.master.as_ref().ok_or(VaultError::KeyUnavailable)?;

        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);

        let kek = derive_key(&master.0, &salt, &self.kdf)?;
        let dek = Dek::generate();

        let sealed = SealedSecret {
            ciphertext: encrypt_payload(&dek, plaintext)?,
            wrapped_dek: wrap(&kek, &dek)?,
            salt: URL_SAFE_NO_PAD.encode(salt),
            kdf: self.kdf,
        };
        debug!(kdf = %sealed.kdf, "Secret sealed");
        Ok(sealed)
    }

    /// Decrypt a sealed record; fails closed.
    pub fn open(&self, sealed: &SealedSecret) -> VaultResult<SecretValue> {
        let master = self.master.as_ref().ok_or(VaultError::KeyUnavailable)?;

        let salt = decode(&sealed.salt)?;
        let kek = derive_key(&master.0, &salt, &sealed.kdf)?;
        let dek = unwrap(&kek, &sealed.wrapped_dek)?;
        decrypt_payload(&dek, &sealed.ciphertext)
    }
}

impl std::fmt::Debug for EnvelopeVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeVault")
            .field("enabled", &self.is_enabled())
            .field("kdf", &self.kdf)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so tests stay fast.
    fn test_kdf() -> KdfParams {
        KdfParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn test_vault(master: &str) -> EnvelopeVault {
        EnvelopeVault::new(master).with_kdf(test_kdf())
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let vault = test_vault("correct horse battery staple");
        let sealed = vault.seal("Xk9#mQ2!vB").unwrap();

        assert_ne!(sealed.ciphertext, "Xk9#mQ2!vB");
        assert!(!sealed.ciphertext.contains("Xk9"));
        assert_eq!(vault.open(&sealed).unwrap().expose(), "Xk9#mQ2!vB");
    }

    #[test]
    fn test_wrong_master_fails_closed() {
        let sealed = test_vault("master-a").seal("payload").unwrap();
        let err = test_vault("master-b").open(&sealed).unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed));
    }

    #[test]
    fn test_payload_wrong_dek_fails_closed() {
        let dek = Dek::generate();
        let other = Dek::generate();
        let ct = encrypt_payload(&dek, "hello").unwrap();
        assert!(matches!(
            decrypt_payload(&other, &ct),
            Err(VaultError::DecryptionFailed)
        ));
        assert_eq!(decrypt_payload(&dek, &ct).unwrap().expose(), "hello");
    }

    #[test]
    fn test_wrap_unwrap() {
        let kek = derive_key(b"master", b"saltsaltsaltsalt", &test_kdf()).unwrap();
        let dek = Dek::generate();
        let wrapped = wrap(&kek, &dek).unwrap();
        let unwrapped = unwrap(&kek, &wrapped).unwrap();
        assert_eq!(unwrapped.0, dek.0);
    }

    #[test]
    fn test_tampered_ciphertext_fails_closed() {
        let vault = test_vault("master");
        let mut sealed = vault.seal("payload").unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&sealed.ciphertext).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        sealed.ciphertext = URL_SAFE_NO_PAD.encode(bytes);

        assert!(matches!(
            vault.open(&sealed),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_truncated_and_garbage_input_fail_closed() {
        let dek = Dek::generate();
        assert!(matches!(
            decrypt_payload(&dek, "AAAA"),
            Err(VaultError::DecryptionFailed)
        ));
        assert!(matches!(
            decrypt_payload(&dek, "not base64 at all!"),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let dek = Dek::generate();
        let a = encrypt_payload(&dek, "same").unwrap();
        let b = encrypt_payload(&dek, "same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_padded_input_accepted() {
        let dek = Dek::generate();
        let unpadded = encrypt_payload(&dek, "pad me").unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(&unpadded).unwrap();
        let padded = URL_SAFE.encode(bytes);
        assert_eq!(decrypt_payload(&dek, &padded).unwrap().expose(), "pad me");
    }

    #[test]
    fn test_encoding_is_url_safe() {
        let dek = Dek::generate();
        for _ in 0..20 {
            let ct = encrypt_payload(&dek, "some payload with bytes").unwrap();
            assert!(!ct.contains('+') && !ct.contains('/') && !ct.contains('='));
        }
    }

    #[test]
    fn test_disabled_vault() {
        let vault = EnvelopeVault::disabled();
        assert!(!vault.is_enabled());
        assert!(matches!(vault.seal("x"), Err(VaultError::KeyUnavailable)));

        let sealed = test_vault("m").seal("x").unwrap();
        assert!(matches!(vault.open(&sealed), Err(VaultError::KeyUnavailable)));
    }

    #[test]
    fn test_kdf_params_descriptor() {
        let params = KdfParams::default();
        assert_eq!(params.to_string(), "argon2id$m=19456,t=2,p=1");
        assert_eq!("argon2id$m=19456,t=2,p=1".parse::<KdfParams>().unwrap(), params);
        assert!("scrypt$n=16384".parse::<KdfParams>().is_err());
        assert!("argon2id$m=1,t=2".parse::<KdfParams>().is_err());
    }

    #[test]
    fn test_oversized_kdf_params_are_rejected() {
        assert!(matches!(
            "argon2id$m=4194304,t=2,p=1".parse::<KdfParams>(),
            Err(VaultError::InvalidParams { .. })
        ));
        assert!("argon2id$m=19456,t=1000,p=1".parse::<KdfParams>().is_err());
        assert!("argon2id$m=19456,t=2,p=64".parse::<KdfParams>().is_err());

        // A record whose stored parameters were raised fails before deriving
        let vault = test_vault("master");
        let mut sealed = vault.seal("payload").unwrap();
        sealed.kdf.memory_kib = u32::MAX;
        assert!(matches!(
            vault.open(&sealed),
            Err(VaultError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_records_remember_their_kdf() {
        let old = test_vault("master");
        let sealed = old.seal("payload").unwrap();

        let newer = EnvelopeVault::new("master").with_kdf(KdfParams {
            memory_kib: 128,
            iterations: 1,
            parallelism: 1,
        });
        assert_eq!(newer.open(&sealed).unwrap().expose(), "payload");
    }

    #[test]
    fn test_debug_hides_master() {
        let debug = format!("{:?}", test_vault("very-secret-master"));
        assert!(!debug.contains("very-secret-master"));
    }
}
