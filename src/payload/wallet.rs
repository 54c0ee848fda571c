//! Wallet-secret payload format, tag `W1`.
//!
//! Serialized layout:
//!
//! ```text
//! W1:<nonceHex>:<cipherB64>
//! ```
//!
//! The ciphertext is AES-256-GCM over the secret envelope, keyed by the
//! active master key. Decrypting therefore requires a live master-key
//! handle; the payload itself carries no KDF parameters.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use crate::crypto::encryption::{self, NONCE_LEN};
use crate::crypto::keys::MasterKey;
use crate::errors::{FormatError, Result};
use crate::payload::{b64_field, nonce_field, require_fields, Payload};

/// Version carried in the `W` tag.
pub const WALLET_VERSION: u8 = 1;

/// An encrypted wallet secret. Immutable value type; the ciphertext is
/// persisted externally and the plaintext never appears in the struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletPayload {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

impl WalletPayload {
    /// Encrypt `plaintext` under `master` with a fresh nonce.
    pub fn seal(master: &MasterKey, plaintext: &[u8]) -> Result<Self> {
        let (nonce, ciphertext) = encryption::encrypt(master.as_bytes(), plaintext)?;
        Ok(Self { nonce, ciphertext })
    }

    /// Decrypt and authenticate. Fails closed on a wrong key or any
    /// tampering, with no partial plaintext.
    pub fn open(&self, master: &MasterKey) -> Result<Zeroizing<Vec<u8>>> {
        let plaintext = encryption::decrypt(master.as_bytes(), &self.nonce, &self.ciphertext)?;
        Ok(Zeroizing::new(plaintext))
    }

    /// Serialize as `W1:<nonceHex>:<cipherB64>`.
    pub fn encode(&self) -> String {
        format!(
            "W{WALLET_VERSION}:{}:{}",
            hex::encode(self.nonce),
            BASE64.encode(&self.ciphertext)
        )
    }

    /// Parse a serialized payload, requiring the wallet format.
    pub fn decode(input: &str) -> Result<Self> {
        match crate::payload::decode(input)? {
            Payload::Wallet(p) => Ok(p),
            Payload::Vault(_) => Err(FormatError::Malformed(
                "expected a wallet-secret payload, got a vault payload".into(),
            )
            .into()),
        }
    }
}

pub(crate) fn from_fields(fields: &[&str]) -> Result<WalletPayload> {
    let fields = require_fields(fields, 2)?;
    Ok(WalletPayload {
        nonce: nonce_field(fields[0])?,
        ciphertext: b64_field("ciphertext", fields[1])?,
    })
}
