//! The persistence boundary.
//!
//! Persisted state — verification record, duress record, lockout
//! state, wallet payload entries — is owned by an external protected
//! store (an OS-keystore-backed container on device). The core only
//! sees this trait; contents are opaque strings and blobs to the
//! orchestration layer.
//!
//! `MemoryStore` is the in-process implementation used by tests and by
//! ephemeral profiles.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{CoreError, Result};

/// Well-known record keys within a profile.
pub mod record_keys {
    /// Password verification record (`VerificationRecord` JSON).
    pub const VERIFICATION: &str = "verification";
    /// Duress-PIN record (`DuressRecord` JSON).
    pub const DURESS: &str = "duress";
    /// Lockout state (`LockoutState` JSON).
    pub const LOCKOUT: &str = "lockout";
    /// Destruction tombstone. Present means the profile is terminally
    /// destroyed.
    pub const TOMBSTONE: &str = "tombstone";
    /// Prefix for wallet-secret payload entries.
    pub const PAYLOAD_PREFIX: &str = "payload:";
    /// Prefix for pre-provisioned decoy payload entries.
    pub const DECOY_PREFIX: &str = "decoy:";

    /// Key for the wallet payload entry named `entry` (usually a chain
    /// name or `wallet`).
    pub fn payload(entry: &str) -> String {
        format!("{PAYLOAD_PREFIX}{entry}")
    }

    /// Key for a pre-provisioned decoy counterpart of `key`.
    pub fn decoy(key: &str) -> String {
        format!("{DECOY_PREFIX}{key}")
    }
}

/// Key-value persistence scoped by profile id.
///
/// Implementations must make `put` durable before returning: lockout
/// accounting relies on a committed write preceding the result the
/// caller sees.
pub trait ProtectedStore: Send + Sync {
    fn put(&self, profile: &str, key: &str, value: &[u8]) -> Result<()>;
    fn get(&self, profile: &str, key: &str) -> Result<Option<Vec<u8>>>;
    fn delete(&self, profile: &str, key: &str) -> Result<()>;
    /// Every key currently present for `profile`.
    fn list_keys(&self, profile: &str) -> Result<Vec<String>>;
}

/// In-memory store for tests and ephemeral profiles.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<(String, String), Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|_| CoreError::StoreError("store lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<(String, String), Vec<u8>>>> {
        self.entries
            .write()
            .map_err(|_| CoreError::StoreError("store lock poisoned".into()))
    }
}

impl ProtectedStore for MemoryStore {
    fn put(&self, profile: &str, key: &str, value: &[u8]) -> Result<()> {
        self.write()?
            .insert((profile.to_string(), key.to_string()), value.to_vec());
        Ok(())
    }

    fn get(&self, profile: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .read()?
            .get(&(profile.to_string(), key.to_string()))
            .cloned())
    }

    fn delete(&self, profile: &str, key: &str) -> Result<()> {
        self.write()?
            .remove(&(profile.to_string(), key.to_string()));
        Ok(())
    }

    fn list_keys(&self, profile: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .read()?
            .keys()
            .filter(|(p, _)| p == profile)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
