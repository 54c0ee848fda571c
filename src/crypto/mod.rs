//! Cryptographic primitives for the wallet core.
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption (`encryption`)
//! - Argon2id memory-hard key derivation (`kdf`)
//! - HKDF-based sub-key expansion and the zeroizing master-key wrapper
//!   (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_key, generate_salt, KdfParams};
pub use keys::MasterKey;
