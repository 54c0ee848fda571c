//! Key expansion helpers using HKDF-SHA256.
//!
//! From one piece of root keying material we derive independent
//! sub-keys by `info` string:
//! - a **per-chain** signing key for each chain name (custom-phrase and
//!   raw roots),
//! - the **verifier** hash stored in a verification record, so the
//!   record can prove a password without ever storing the password or
//!   the master key.
//!
//! HKDF (RFC 5869) uses the root as input keying material and a context
//! string (`info`) to produce independent sub-keys. The extract step is
//! skipped: every root here already has high entropy (Argon2id output,
//! a BIP-39 seed, or OS randomness).

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{CoreError, Result};

/// Length of derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

/// Derive a per-chain signing key from root key material.
///
/// `info` is set to `"keycell-chain:<chain_name>"` so each chain gets an
/// independent key and compromising one never reveals another.
pub fn derive_chain_key(root: &[u8], chain_name: &str) -> Result<[u8; KEY_LEN]> {
    let info = format!("keycell-chain:{chain_name}");
    hkdf_derive(root, info.as_bytes())
}

/// Derive the verifier bytes stored in a verification record.
///
/// Domain-separated from every other use of the master key, so the
/// stored verifier is useless for decrypting payloads.
pub fn derive_verifier(master_key: &[u8]) -> Result<[u8; KEY_LEN]> {
    hkdf_derive(master_key, b"keycell-verifier")
}

/// Expand arbitrary high-entropy input into a 32-byte root.
pub fn expand_root(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    hkdf_derive(ikm, info)
}

/// Internal helper: run HKDF-SHA256 expand with the given `info`.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    // `salt` is None — HKDF uses a zero-filled salt internally.
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| CoreError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A wrapper around a 32-byte symmetric master key that automatically
/// zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (to pass to AEAD or HKDF).
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the verifier bytes for this key.
    pub fn verifier(&self) -> Result<[u8; KEY_LEN]> {
        derive_verifier(&self.bytes)
    }
}

// Never print key material.
impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
