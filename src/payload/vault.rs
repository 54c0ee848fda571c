//! Standalone vault payload format, tag `V<version>`.
//!
//! Serialized layout (version 1):
//!
//! ```text
//! V1:<kdfOps>:<kdfMemKib>:<saltHex>:<nonceHex>:<cipherB64>
//! ```
//!
//! Vault payloads protect ad-hoc text directly under a password-derived
//! key — no master-key handle involved. The Argon2id cost parameters
//! travel inside the payload, so the configured costs can be raised
//! later without breaking anything sealed under the old ones. Format
//! version 1 fixes the Argon2 lane count at 1; a future version would
//! carry it as a field.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::encryption::{self, NONCE_LEN};
use crate::crypto::kdf::{self, KdfParams};
use crate::errors::{FormatError, Result};
use crate::payload::{b64_field, hex_field, nonce_field, require_fields, u32_field, Payload};

/// Current vault format version.
pub const VAULT_VERSION: u8 = 1;

/// Argon2 lanes for format version 1.
const VAULT_LANES: u32 = 1;

/// An encrypted vault text with self-describing KDF costs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPayload {
    pub version: u8,
    pub kdf_ops: u32,
    pub kdf_mem_kib: u32,
    pub salt: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

impl VaultPayload {
    /// Encrypt `plaintext` under a key derived from `password` with the
    /// given cost parameters and a fresh random salt.
    pub fn seal(plaintext: &[u8], password: &[u8], params: &KdfParams) -> Result<Self> {
        let salt = kdf::generate_salt();
        let effective = KdfParams {
            memory_kib: params.memory_kib,
            iterations: params.iterations,
            parallelism: VAULT_LANES,
        };

        let mut key = kdf::derive_key(password, &salt, &effective)?;
        let sealed = encryption::encrypt(&key, plaintext);
        key.zeroize();
        let (nonce, ciphertext) = sealed?;

        Ok(Self {
            version: VAULT_VERSION,
            kdf_ops: effective.iterations,
            kdf_mem_kib: effective.memory_kib,
            salt: salt.to_vec(),
            nonce,
            ciphertext,
        })
    }

    /// Re-derive the key from the payload's own cost parameters and
    /// decrypt. A wrong password fails closed as an integrity failure.
    pub fn open(&self, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let params = KdfParams {
            memory_kib: self.kdf_mem_kib,
            iterations: self.kdf_ops,
            parallelism: VAULT_LANES,
        };

        let mut key = kdf::derive_key(password, &self.salt, &params)?;
        let opened = encryption::decrypt(&key, &self.nonce, &self.ciphertext);
        key.zeroize();

        Ok(Zeroizing::new(opened?))
    }

    /// Serialize as `V1:<ops>:<memKib>:<saltHex>:<nonceHex>:<cipherB64>`.
    pub fn encode(&self) -> String {
        format!(
            "V{}:{}:{}:{}:{}:{}",
            self.version,
            self.kdf_ops,
            self.kdf_mem_kib,
            hex::encode(&self.salt),
            hex::encode(self.nonce),
            BASE64.encode(&self.ciphertext)
        )
    }

    /// Parse a serialized payload, requiring the vault format.
    pub fn decode(input: &str) -> Result<Self> {
        match crate::payload::decode(input)? {
            Payload::Vault(p) => Ok(p),
            Payload::Wallet(_) => Err(FormatError::Malformed(
                "expected a vault payload, got a wallet-secret payload".into(),
            )
            .into()),
        }
    }
}

pub(crate) fn from_fields(fields: &[&str]) -> Result<VaultPayload> {
    let fields = require_fields(fields, 5)?;
    Ok(VaultPayload {
        version: VAULT_VERSION,
        kdf_ops: u32_field("kdf_ops", fields[0])?,
        kdf_mem_kib: u32_field("kdf_mem_kib", fields[1])?,
        salt: hex_field("salt", fields[2])?,
        nonce: nonce_field(fields[3])?,
        ciphertext: b64_field("ciphertext", fields[4])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AuthFailure, CoreError};

    fn cheap_params() -> KdfParams {
        KdfParams {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 4, // replaced by the format's fixed lane count
        }
    }

    #[test]
    fn seal_encode_decode_open_roundtrip() {
        let payload = VaultPayload::seal(b"meet me at dawn", b"hunter2!", &cheap_params()).unwrap();

        let encoded = payload.encode();
        assert!(encoded.starts_with("V1:1:8192:"));

        let decoded = VaultPayload::decode(&encoded).unwrap();
        assert_eq!(decoded, payload);

        let plaintext = decoded.open(b"hunter2!").unwrap();
        assert_eq!(&*plaintext, b"meet me at dawn");
    }

    #[test]
    fn wrong_password_yields_auth_failure() {
        let payload = VaultPayload::seal(b"meet me at dawn", b"hunter2!", &cheap_params()).unwrap();
        let err = payload.open(b"hunter3!").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Auth(AuthFailure::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn costs_travel_with_the_payload() {
        let heavier = KdfParams {
            memory_kib: 16_384,
            iterations: 2,
            parallelism: 1,
        };
        let payload = VaultPayload::seal(b"x", b"pw", &heavier).unwrap();
        let decoded = VaultPayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded.kdf_ops, 2);
        assert_eq!(decoded.kdf_mem_kib, 16_384);
        // Opening uses the payload's own parameters, not the config.
        assert_eq!(&*decoded.open(b"pw").unwrap(), b"x");
    }

    #[test]
    fn weakened_cost_fields_fail_closed() {
        // An attacker lowering the advertised memory cost below the
        // floor gets a derivation error, not a cheap decrypt oracle.
        let payload = VaultPayload::seal(b"x", b"pw", &cheap_params()).unwrap();
        let mut tampered = payload.clone();
        tampered.kdf_mem_kib = 64;
        assert!(tampered.open(b"pw").is_err());
    }
}
