//! Hierarchical-deterministic key derivation from a 64-byte seed.
//!
//! Two derivers cover the supported curves:
//! - `derive_secp256k1` — BIP-32 (HMAC-SHA512 hierarchical derivation),
//!   used by EVM chains.
//! - `derive_ed25519` — SLIP-0010, which only supports hardened
//!   derivation: every path level must carry a `'` suffix.
//!
//! Both return 32-byte private keys wrapped in `Zeroizing` and clear
//! every intermediate key and chain code before returning.

use std::str::FromStr;

use bip32::{DerivationPath, XPrv};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{CoreError, Result};

type HmacSha512 = Hmac<Sha512>;

/// SLIP-0010 master key seed constant for ed25519.
const ED25519_MASTER_SECRET: &[u8] = b"ed25519 seed";

/// Derive a secp256k1 private key from `seed` along a BIP-32 `path`
/// (e.g. `m/44'/60'/0'/0/0`).
pub fn derive_secp256k1(seed: &[u8; 64], path: &str) -> Result<Zeroizing<[u8; 32]>> {
    let root = XPrv::new(seed)
        .map_err(|e| CoreError::KeyDerivationFailed(format!("master key: {e}")))?;

    let derivation_path = DerivationPath::from_str(path)
        .map_err(|e| CoreError::KeyDerivationFailed(format!("invalid path '{path}': {e}")))?;

    let mut child = root;
    for child_number in derivation_path {
        child = child
            .derive_child(child_number)
            .map_err(|e| CoreError::KeyDerivationFailed(format!("child derivation: {e}")))?;
    }

    let key_bytes: [u8; 32] = child.private_key().to_bytes().into();
    Ok(Zeroizing::new(key_bytes))
}

/// Derive an ed25519 private key from `seed` along a SLIP-0010 `path`
/// (e.g. `m/44'/501'/0'/0'`). All levels must be hardened.
pub fn derive_ed25519(seed: &[u8; 64], path: &str) -> Result<Zeroizing<[u8; 32]>> {
    let indices = parse_hardened_path(path)?;

    let (mut key, mut chain_code) = ed25519_master(seed)?;
    for index in indices {
        let (child_key, child_chain) = ed25519_child(&key, &chain_code, index)?;
        key.zeroize();
        chain_code.zeroize();
        key = child_key;
        chain_code = child_chain;
    }
    chain_code.zeroize();

    Ok(Zeroizing::new(key))
}

/// I = HMAC-SHA512(Key = "ed25519 seed", Data = seed).
/// IL is the master private key, IR the chain code.
fn ed25519_master(seed: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    let mut mac = HmacSha512::new_from_slice(ED25519_MASTER_SECRET)
        .map_err(|e| CoreError::KeyDerivationFailed(format!("HMAC init: {e}")))?;
    mac.update(seed);
    split_hmac(mac)
}

/// Hardened child step:
/// I = HMAC-SHA512(Key = chain_code, Data = 0x00 || key || ser32(index | 0x80000000)).
fn ed25519_child(
    parent_key: &[u8; 32],
    parent_chain_code: &[u8; 32],
    index: u32,
) -> Result<([u8; 32], [u8; 32])> {
    let mut mac = HmacSha512::new_from_slice(parent_chain_code)
        .map_err(|e| CoreError::KeyDerivationFailed(format!("HMAC init: {e}")))?;

    let hardened_index = index | 0x8000_0000;
    mac.update(&[0x00]);
    mac.update(parent_key);
    mac.update(&hardened_index.to_be_bytes());
    split_hmac(mac)
}

fn split_hmac(mac: HmacSha512) -> Result<([u8; 32], [u8; 32])> {
    let result = mac.finalize().into_bytes();

    // Copy into a stack buffer we fully control, then zeroize it.
    let mut buf = [0u8; 64];
    buf.copy_from_slice(&result);

    let mut key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    key.copy_from_slice(&buf[..32]);
    chain_code.copy_from_slice(&buf[32..]);
    buf.zeroize();

    Ok((key, chain_code))
}

/// Parse a SLIP-0010 path into hardened indices. Every level must end
/// with `'` or `h`.
fn parse_hardened_path(path: &str) -> Result<Vec<u32>> {
    let path = path.trim();
    let segments = path
        .strip_prefix("m/")
        .ok_or_else(|| CoreError::KeyDerivationFailed(format!("path must start with m/: {path}")))?;
    if segments.is_empty() {
        return Err(CoreError::KeyDerivationFailed("empty derivation path".into()));
    }

    let mut indices = Vec::new();
    for segment in segments.split('/') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let num_str = segment
            .strip_suffix('\'')
            .or_else(|| segment.strip_suffix('h'))
            .ok_or_else(|| {
                CoreError::KeyDerivationFailed(format!(
                    "ed25519 requires all levels hardened, bad segment '{segment}'"
                ))
            })?;
        let index: u32 = num_str
            .parse()
            .map_err(|e| CoreError::KeyDerivationFailed(format!("index '{num_str}': {e}")))?;
        indices.push(index);
    }
    Ok(indices)
}
