//! Envelope vault behaviour through the public API.

use dirgate_secrets::{generate, EnvelopeVault, KdfParams, SealedSecret, VaultError};

fn fast_vault(master: &str) -> EnvelopeVault {
    EnvelopeVault::new(master).with_kdf(KdfParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
}

#[test]
fn test_generated_secret_survives_seal_and_open() {
    let vault = fast_vault("panel-master-secret");
    for _ in 0..5 {
        let secret = generate(16, true);
        let sealed = vault.seal(secret.expose()).unwrap();
        assert_eq!(vault.open(&sealed).unwrap(), secret);
    }
}

#[test]
fn test_every_record_has_its_own_salt_and_dek() {
    let vault = fast_vault("panel-master-secret");
    let a = vault.seal("same").unwrap();
    let b = vault.seal("same").unwrap();
    assert_ne!(a.salt, b.salt);
    assert_ne!(a.wrapped_dek, b.wrapped_dek);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn test_swapped_wrapped_dek_fails_closed() {
    let vault = fast_vault("panel-master-secret");
    let a = vault.seal("first").unwrap();
    let b = vault.seal("second").unwrap();

    let mixed = SealedSecret {
        wrapped_dek: b.wrapped_dek.clone(),
        ..a
    };
    assert!(matches!(
        vault.open(&mixed),
        Err(VaultError::DecryptionFailed)
    ));
}

#[test]
fn test_sealed_secret_serializes() {
    let vault = fast_vault("panel-master-secret");
    let sealed = vault.seal("payload").unwrap();
    let json = serde_json::to_string(&sealed).unwrap();
    let back: SealedSecret = serde_json::from_str(&json).unwrap();
    assert_eq!(vault.open(&back).unwrap().expose(), "payload");
}

#[test]
fn test_error_codes() {
    assert_eq!(VaultError::KeyUnavailable.error_code(), "KEY_UNAVAILABLE");
    assert_eq!(VaultError::DecryptionFailed.error_code(), "DECRYPTION_FAILED");
}
