//! Conversion of validated secret material into derivable root keys.
//!
//! Each secret kind yields a different shape of root:
//! - a mnemonic becomes the 64-byte BIP-39 seed, walked by the HD
//!   derivers;
//! - an imported private key is its own 32-byte root, used directly on
//!   every chain;
//! - a custom phrase is stretched by the heavy Argon2id profile over a
//!   fixed domain salt, and per-chain keys are then expanded from that
//!   root with domain-separated HKDF;
//! - raw entropy is HKDF-expanded into the same shape.

use bip39::Mnemonic;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::kdf::{self, KdfParams};
use crate::crypto::keys;
use crate::errors::{Result, ValidationError};
use crate::secret::record::SecretKind;
use crate::secret::validate;

/// Fixed domain salt for custom-phrase root derivation. Constant by
/// design: the phrase alone must reproduce the same wallet on any
/// device.
const PHRASE_ROOT_SALT: &[u8] = b"keycell/phrase-root/v1";

/// Root key material a session derives chain keys from.
#[derive(Zeroize)]
#[zeroize(drop)]
pub enum RootKey {
    /// 64-byte BIP-39 seed; chain keys come from HD derivation paths.
    HdSeed([u8; 64]),
    /// Single imported key; used directly on every chain.
    SingleKey([u8; 32]),
    /// Stretched root; per-chain keys are HKDF-expanded from it.
    Expanded([u8; 32]),
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            RootKey::HdSeed(_) => "HdSeed",
            RootKey::SingleKey(_) => "SingleKey",
            RootKey::Expanded(_) => "Expanded",
        };
        write!(f, "RootKey::{variant}([REDACTED])")
    }
}

/// Build the root key for a validated secret.
///
/// `vault_params` is the heavy Argon2id profile — custom phrases are a
/// low-entropy input and get the expensive stretch, invoked rarely.
pub(crate) fn root_key_for(
    kind: SecretKind,
    bytes: &[u8],
    vault_params: &KdfParams,
) -> Result<RootKey> {
    match kind {
        SecretKind::Mnemonic => {
            let text = std::str::from_utf8(bytes).map_err(|_| ValidationError::NotUtf8)?;
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let mnemonic = Mnemonic::parse(&normalized)
                .map_err(|e| ValidationError::InvalidMnemonic(e.to_string()))?;
            Ok(RootKey::HdSeed(mnemonic.to_seed("")))
        }
        SecretKind::PrivateKey => {
            let key = validate::parse_private_key(bytes)?;
            Ok(RootKey::SingleKey(*key))
        }
        SecretKind::CustomPhrase => {
            let root = kdf::derive_key(bytes, PHRASE_ROOT_SALT, vault_params)?;
            Ok(RootKey::Expanded(root))
        }
        SecretKind::Raw => {
            let root = keys::expand_root(bytes, b"keycell-root:raw")?;
            Ok(RootKey::Expanded(root))
        }
    }
}

impl RootKey {
    /// The 32-byte key for `chain_name`, independent per chain for
    /// non-HD roots. HD seeds don't use this — they go through the path
    /// derivers instead.
    pub(crate) fn chain_key(&self, chain_name: &str) -> Result<Zeroizing<[u8; 32]>> {
        match self {
            RootKey::SingleKey(key) => Ok(Zeroizing::new(*key)),
            RootKey::Expanded(root) => Ok(Zeroizing::new(keys::derive_chain_key(
                root, chain_name,
            )?)),
            RootKey::HdSeed(_) => Err(crate::errors::CoreError::KeyDerivationFailed(
                "HD seeds derive through a path, not a chain key".into(),
            )),
        }
    }
}
