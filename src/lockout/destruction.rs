//! Irreversible per-profile destruction and the duress trigger.
//!
//! `Destroyed` is terminal: every payload entry and credential record
//! for the profile is erased and a tombstone takes their place. The
//! tombstone is written *first*, so a crash mid-wipe still leaves the
//! profile dead rather than partially alive. If decoy entries were
//! pre-provisioned, they are substituted for the real payload set.
//!
//! Duress-PIN verification is a hash-only comparison: the stored record
//! holds a SHA-256 digest, checked in constant time. A match destroys
//! the profile immediately, from any lockout state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{CoreError, Result};
use crate::store::{record_keys, ProtectedStore};

/// Persisted duress record: only the hash, never the PIN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuressRecord {
    #[serde(
        serialize_with = "crate::payload::base64_encode",
        deserialize_with = "crate::payload::base64_decode"
    )]
    pub hash: Vec<u8>,
}

impl DuressRecord {
    pub fn from_pin(pin: &[u8]) -> Self {
        Self {
            hash: Sha256::digest(pin).to_vec(),
        }
    }

    /// Constant-time check of a candidate PIN.
    pub fn matches(&self, pin: &[u8]) -> bool {
        let candidate = Sha256::digest(pin);
        bool::from(candidate.as_slice().ct_eq(&self.hash))
    }
}

pub struct DestructionCoordinator {
    store: Arc<dyn ProtectedStore>,
}

impl DestructionCoordinator {
    pub fn new(store: Arc<dyn ProtectedStore>) -> Self {
        Self { store }
    }

    /// Persist the duress record for a profile.
    pub fn set_duress_record(&self, profile: &str, record: &DuressRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| CoreError::SerializationError(format!("duress record: {e}")))?;
        self.store.put(profile, record_keys::DURESS, &bytes)
    }

    /// Whether `pin` matches the profile's duress record. `false` when
    /// no record is provisioned.
    pub fn check_duress(&self, profile: &str, pin: &[u8]) -> Result<bool> {
        match self.store.get(profile, record_keys::DURESS)? {
            Some(bytes) => {
                let record: DuressRecord = serde_json::from_slice(&bytes)
                    .map_err(|e| CoreError::SerializationError(format!("duress record: {e}")))?;
                Ok(record.matches(pin))
            }
            None => Ok(false),
        }
    }

    /// Whether the profile has been destroyed.
    pub fn is_destroyed(&self, profile: &str) -> Result<bool> {
        Ok(self.store.get(profile, record_keys::TOMBSTONE)?.is_some())
    }

    /// Destroy a profile: erase every payload and credential record,
    /// substituting pre-provisioned decoy entries if present.
    ///
    /// Idempotent and irreversible. The tombstone goes down before the
    /// wipe begins.
    pub fn destroy(&self, profile: &str) -> Result<()> {
        self.store.put(profile, record_keys::TOMBSTONE, b"1")?;
        log::warn!("destroying profile data");

        // Pull decoy entries out before the sweep.
        let keys = self.store.list_keys(profile)?;
        let mut decoys = Vec::new();
        for key in &keys {
            if let Some(real_key) = key.strip_prefix(record_keys::DECOY_PREFIX) {
                if let Some(value) = self.store.get(profile, key)? {
                    decoys.push((real_key.to_string(), value));
                }
            }
        }

        for key in &keys {
            if key != record_keys::TOMBSTONE {
                self.store.delete(profile, key)?;
            }
        }

        for (key, value) in decoys {
            self.store.put(profile, &key, &value)?;
        }

        Ok(())
    }
}
