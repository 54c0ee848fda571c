//! Secret record types held by the `SecretStore`.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::payload::{base64_decode, base64_encode};

/// What kind of secret material a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretKind {
    /// BIP-39 mnemonic phrase.
    Mnemonic,
    /// Single secp256k1 private key, raw 32 bytes or hex.
    PrivateKey,
    /// User-chosen passphrase, stretched into a root key.
    CustomPhrase,
    /// Raw entropy bytes.
    Raw,
}

impl SecretKind {
    pub fn name(self) -> &'static str {
        match self {
            SecretKind::Mnemonic => "mnemonic",
            SecretKind::PrivateKey => "privatekey",
            SecretKind::CustomPhrase => "customphrase",
            SecretKind::Raw => "raw",
        }
    }
}

/// Outcome of kind-specific input validation, returned across the
/// boundary alongside the issued handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub kind: SecretKind,
    pub valid: bool,
    /// Human-readable note when something is worth surfacing; `None`
    /// for a clean pass.
    pub reason: Option<String>,
    /// Estimated entropy of the input in bits.
    pub entropy_bits: f64,
}

/// Normalized plaintext secret material, held until it is consumed into
/// an encrypted payload or explicitly cancelled.
///
/// The record owns the only copy of the secret bytes. It zeroizes on
/// registry disposal and never prints its contents.
pub struct SecretRecord {
    pub kind: SecretKind,
    bytes: Zeroizing<Vec<u8>>,
    pub report: ValidationReport,
}

impl SecretRecord {
    pub(crate) fn new(kind: SecretKind, bytes: Vec<u8>, report: ValidationReport) -> Self {
        Self {
            kind,
            bytes: Zeroizing::new(bytes),
            report,
        }
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Zeroize for SecretRecord {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRecord")
            .field("kind", &self.kind)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// What a wallet-secret payload actually encrypts: the original secret
/// bytes plus the kind tag needed to rebuild a root key at signing
/// time.
#[derive(Serialize, Deserialize)]
pub struct SecretEnvelope {
    pub kind: SecretKind,
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub data: Vec<u8>,
}

impl SecretEnvelope {
    pub(crate) fn to_json(&self) -> crate::errors::Result<Zeroizing<Vec<u8>>> {
        serde_json::to_vec(self)
            .map(Zeroizing::new)
            .map_err(|e| crate::errors::CoreError::SerializationError(format!("envelope: {e}")))
    }

    pub(crate) fn from_json(bytes: &[u8]) -> crate::errors::Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| crate::errors::CoreError::SerializationError(format!("envelope: {e}")))
    }
}

impl Drop for SecretEnvelope {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl std::fmt::Debug for SecretEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEnvelope")
            .field("kind", &self.kind)
            .field("data", &"[REDACTED]")
            .finish()
    }
}
