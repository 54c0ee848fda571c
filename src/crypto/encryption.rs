//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! returns it alongside the ciphertext. The payload formats carry the
//! nonce as an explicit field, so unlike a nonce-prefixed blob the two
//! parts stay separate here and `decrypt` takes them separately.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{AuthFailure, CoreError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Encrypt `plaintext` with a 32-byte `key`.
///
/// Returns the fresh random nonce and the ciphertext (which includes the
/// 16-byte auth tag).
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<([u8; NONCE_LEN], Vec<u8>)> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CoreError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CoreError::EncryptionFailed(format!("encryption error: {e}")))?;

    Ok((nonce.into(), ciphertext))
}

/// Decrypt data that was produced by `encrypt`.
///
/// Fails closed: a wrong key, a wrong nonce, or a single flipped
/// ciphertext bit all yield `AuthFailure::IntegrityCheckFailed` with no
/// partial plaintext.
pub fn decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(CoreError::Auth(AuthFailure::IntegrityCheckFailed));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| CoreError::Auth(AuthFailure::IntegrityCheckFailed))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CoreError::Auth(AuthFailure::IntegrityCheckFailed))?;

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = [0x42u8; 32];
        let (nonce, ct) = encrypt(&key, b"attack at dawn").unwrap();
        let pt = decrypt(&key, &nonce, &ct).unwrap();
        assert_eq!(pt, b"attack at dawn");
    }

    #[test]
    fn wrong_key_fails_closed() {
        let (nonce, ct) = encrypt(&[0x42u8; 32], b"attack at dawn").unwrap();
        let err = decrypt(&[0x43u8; 32], &nonce, &ct).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Auth(AuthFailure::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_closed() {
        let key = [0x42u8; 32];
        let (nonce, mut ct) = encrypt(&key, b"attack at dawn").unwrap();
        ct[0] ^= 0x01;
        assert!(decrypt(&key, &nonce, &ct).is_err());
    }

    #[test]
    fn nonces_are_fresh_per_call() {
        let key = [0x42u8; 32];
        let (n1, _) = encrypt(&key, b"x").unwrap();
        let (n2, _) = encrypt(&key, b"x").unwrap();
        assert_ne!(n1, n2);
    }

    #[test]
    fn bad_nonce_length_rejected() {
        let key = [0x42u8; 32];
        let (_, ct) = encrypt(&key, b"x").unwrap();
        assert!(decrypt(&key, &[0u8; 8], &ct).is_err());
    }
}
