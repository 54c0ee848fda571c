//! Supported chains: key derivation, addresses, and signing.
//!
//! Only addresses and public-key summaries ever leave this module;
//! private key bytes stay inside the session layer.

use ed25519_dalek::Signer;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{CoreError, Result};
use crate::secret::root::RootKey;
use crate::session::derive;

/// A chain the core can derive addresses and sign for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// EVM chains — secp256k1, BIP-32, keccak addresses.
    Ethereum,
    /// Solana — ed25519, SLIP-0010 hardened-only, base58 addresses.
    Solana,
}

/// What a derivation hands back across the boundary: an address and a
/// public-key summary, never key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub chain: Chain,
    pub address: String,
    pub public_key_summary: String,
}

impl Chain {
    pub fn name(self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Solana => "solana",
        }
    }

    /// Default derivation path for an account index.
    pub fn default_path(self, account: u32) -> String {
        match self {
            // BIP-44, coin type 60.
            Chain::Ethereum => format!("m/44'/60'/0'/0/{account}"),
            // SLIP-0010, coin type 501, all levels hardened.
            Chain::Solana => format!("m/44'/501'/{account}'/0'"),
        }
    }

    /// Derive the 32-byte private key for this chain from a root.
    ///
    /// HD seeds walk the derivation path; single-key and expanded roots
    /// use their per-chain key and record the path only for caching.
    pub(crate) fn derive_key(self, root: &RootKey, path: &str) -> Result<Zeroizing<[u8; 32]>> {
        match root {
            RootKey::HdSeed(seed) => match self {
                Chain::Ethereum => derive::derive_secp256k1(seed, path),
                Chain::Solana => derive::derive_ed25519(seed, path),
            },
            _ => root.chain_key(self.name()),
        }
    }

    /// Compute the address and public-key summary for a private key.
    pub(crate) fn address_info(self, private: &[u8; 32]) -> Result<AddressInfo> {
        match self {
            Chain::Ethereum => {
                let signing = SigningKey::from_slice(private)
                    .map_err(|e| CoreError::KeyDerivationFailed(format!("secp256k1 key: {e}")))?;
                let verifying = signing.verifying_key();

                // Keccak-256 over the uncompressed public key without
                // the 0x04 prefix; the address is the last 20 bytes.
                let encoded = verifying.to_encoded_point(false);
                let mut hash = [0u8; 32];
                let mut keccak = Keccak::v256();
                keccak.update(&encoded.as_bytes()[1..]);
                keccak.finalize(&mut hash);

                let mut address_bytes = [0u8; 20];
                address_bytes.copy_from_slice(&hash[12..]);
                hash.zeroize();

                let compressed = verifying.to_encoded_point(true);
                Ok(AddressInfo {
                    chain: self,
                    address: eip55_checksum(&address_bytes),
                    public_key_summary: format!("secp256k1:{}", hex::encode(compressed.as_bytes())),
                })
            }
            Chain::Solana => {
                let signing = ed25519_dalek::SigningKey::from_bytes(private);
                let public = signing.verifying_key().to_bytes();
                Ok(AddressInfo {
                    chain: self,
                    address: bs58::encode(public).into_string(),
                    public_key_summary: format!("ed25519:{}", hex::encode(public)),
                })
            }
        }
    }

    /// Sign `message` with a chain-appropriate scheme.
    ///
    /// Ethereum: recoverable ECDSA over keccak256(message), 65 bytes
    /// `r || s || v` with the legacy 27-offset recovery byte.
    /// Solana: Ed25519 over the raw message, 64 bytes.
    pub(crate) fn sign(self, private: &[u8; 32], message: &[u8]) -> Result<Vec<u8>> {
        match self {
            Chain::Ethereum => {
                let signing = SigningKey::from_slice(private)
                    .map_err(|e| CoreError::SigningFailed(format!("secp256k1 key: {e}")))?;

                let mut digest = [0u8; 32];
                let mut keccak = Keccak::v256();
                keccak.update(message);
                keccak.finalize(&mut digest);

                let (signature, recovery_id) = signing
                    .sign_prehash_recoverable(&digest)
                    .map_err(|e| CoreError::SigningFailed(e.to_string()))?;

                let mut out = Vec::with_capacity(65);
                out.extend_from_slice(&signature.to_bytes());
                out.push(recovery_id.to_byte() + 27);
                Ok(out)
            }
            Chain::Solana => {
                let signing = ed25519_dalek::SigningKey::from_bytes(private);
                Ok(signing.sign(message).to_bytes().to_vec())
            }
        }
    }
}

/// EIP-55 mixed-case checksum encoding of a 20-byte address.
fn eip55_checksum(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);

    let mut hash = [0u8; 32];
    let mut keccak = Keccak::v256();
    keccak.update(lower.as_bytes());
    keccak.finalize(&mut hash);

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    // Anvil/Hardhat account #0 — a well-known test vector.
    const ANVIL_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ANVIL_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn anvil_key() -> [u8; 32] {
        hex::decode(ANVIL_PRIVATE_KEY).unwrap().try_into().unwrap()
    }

    #[test]
    fn ethereum_address_matches_known_vector() {
        let info = Chain::Ethereum.address_info(&anvil_key()).unwrap();
        assert_eq!(info.address, ANVIL_ADDRESS);
        assert!(info.public_key_summary.starts_with("secp256k1:"));
    }

    #[test]
    fn solana_address_is_base58_of_public_key() {
        let info = Chain::Solana.address_info(&[0x11u8; 32]).unwrap();
        let decoded = bs58::decode(&info.address).into_vec().unwrap();
        assert_eq!(decoded.len(), 32);
        assert_eq!(
            info.public_key_summary,
            format!("ed25519:{}", hex::encode(decoded))
        );
    }

    #[test]
    fn ethereum_signature_is_recoverable_form() {
        let sig = Chain::Ethereum.sign(&anvil_key(), b"payload bytes").unwrap();
        assert_eq!(sig.len(), 65);
        assert!(sig[64] == 27 || sig[64] == 28);
    }

    #[test]
    fn solana_signature_verifies() {
        let key = [0x11u8; 32];
        let sig = Chain::Solana.sign(&key, b"payload bytes").unwrap();
        assert_eq!(sig.len(), 64);

        let signing = ed25519_dalek::SigningKey::from_bytes(&key);
        let signature = ed25519_dalek::Signature::from_bytes(&sig.try_into().unwrap());
        assert!(signing
            .verifying_key()
            .verify(b"payload bytes", &signature)
            .is_ok());
    }

    #[test]
    fn signing_is_deterministic_per_chain() {
        let key = [0x22u8; 32];
        assert_eq!(
            Chain::Ethereum.sign(&key, b"m").unwrap(),
            Chain::Ethereum.sign(&key, b"m").unwrap()
        );
        assert_eq!(
            Chain::Solana.sign(&key, b"m").unwrap(),
            Chain::Solana.sign(&key, b"m").unwrap()
        );
    }

    #[test]
    fn default_paths_are_chain_appropriate() {
        assert_eq!(Chain::Ethereum.default_path(0), "m/44'/60'/0'/0/0");
        assert_eq!(Chain::Solana.default_path(2), "m/44'/501'/2'/0'");
    }

    #[test]
    fn eip55_known_vector() {
        let bytes: [u8; 20] = hex::decode("fb6916095ca1df60bb79ce92ce3ea74c37c5d359")
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(
            eip55_checksum(&bytes),
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        );
    }
}
