//! Master key derivation and lifecycle.
//!
//! The master key is the symmetric key protecting wallet-secret
//! payloads. It is derived from a password through Argon2id — with an
//! explicit cost profile per call site — or handed over by a
//! platform-supplied unwrap capability (biometric path). Derived keys
//! live behind handles; records zeroize on disposal, expiry, or app
//! lock.
//!
//! The verification record persisted for a profile stores only the
//! salt, the KDF parameters, and an HKDF-separated verifier hash of the
//! derived key — never the password and never the key itself.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::config::Settings;
use crate::crypto::kdf::{self, KdfParams};
use crate::crypto::keys::MasterKey;
use crate::errors::{AuthFailure, HandleError, Result};
use crate::handle::{Handle, HandleKind, HandleRegistry};

/// Which Argon2id cost profile a derivation uses.
///
/// `Unlock` is tuned for the frequent app-unlock path; `Vault` is the
/// heavier profile for rarely-invoked vault and custom-phrase work.
/// The choice is made per call site — there is no global constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfProfile {
    Unlock,
    Vault,
}

/// KDF parameters as persisted inside a verification record, so the
/// exact same settings are used at every unlock even after the
/// configured profile changes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredKdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<KdfParams> for StoredKdfParams {
    fn from(p: KdfParams) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

impl From<StoredKdfParams> for KdfParams {
    fn from(p: StoredKdfParams) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

/// Persisted proof that a password is correct: salt, KDF parameters,
/// and the verifier hash. Opaque to the orchestration layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    #[serde(
        serialize_with = "crate::payload::base64_encode",
        deserialize_with = "crate::payload::base64_decode"
    )]
    pub salt: Vec<u8>,
    pub params: StoredKdfParams,
    #[serde(
        serialize_with = "crate::payload::base64_encode",
        deserialize_with = "crate::payload::base64_decode"
    )]
    pub verifier: Vec<u8>,
}

/// The platform's biometric bridge, modeled purely as a capability:
/// given an unwrap, the core obtains key bytes equivalent to a password
/// derivation. Hardware access never happens inside the core.
pub trait UnwrapCapability {
    fn unwrap_key(&self) -> Result<[u8; 32]>;
}

struct MasterKeyRecord {
    key: MasterKey,
    expires_at: Option<DateTime<Utc>>,
}

impl Zeroize for MasterKeyRecord {
    fn zeroize(&mut self) {
        self.key.zeroize();
    }
}

pub struct MasterKeyService {
    registry: HandleRegistry<MasterKeyRecord>,
    unlock_params: KdfParams,
    vault_params: KdfParams,
    ttl: Option<Duration>,
}

impl MasterKeyService {
    pub fn new(settings: &Settings) -> Self {
        Self {
            registry: HandleRegistry::new(HandleKind::MasterKey),
            unlock_params: settings.unlock_kdf_params(),
            vault_params: settings.vault_kdf_params(),
            ttl: settings
                .master_key_ttl_secs
                .map(|secs| Duration::seconds(secs as i64)),
        }
    }

    pub(crate) fn params_for(&self, profile: KdfProfile) -> KdfParams {
        match profile {
            KdfProfile::Unlock => self.unlock_params,
            KdfProfile::Vault => self.vault_params,
        }
    }

    /// Enroll a password: fresh salt, derivation under `profile`, and a
    /// verification record that can later prove the password without
    /// storing it.
    pub fn create_verification_record(
        &self,
        password: &[u8],
        profile: KdfProfile,
    ) -> Result<VerificationRecord> {
        let salt = kdf::generate_salt();
        let params = self.params_for(profile);

        let mut key_bytes = kdf::derive_key(password, &salt, &params)?;
        let key = MasterKey::new(key_bytes);
        key_bytes.zeroize();

        Ok(VerificationRecord {
            salt: salt.to_vec(),
            params: params.into(),
            verifier: key.verifier()?.to_vec(),
        })
    }

    /// Derive a master key from a password, checking it against the
    /// verification record.
    ///
    /// Derivation uses the record's stored parameters, so a later
    /// config change never locks out an existing profile. A verifier
    /// mismatch is `AuthFailure::BadCredentials`; the caller feeds it
    /// to the lockout guard.
    ///
    /// This call is CPU/memory-bound for as long as the stored cost
    /// dictates — keep it off latency-sensitive paths. To cancel, time
    /// out and abandon the eventual handle; never interrupt the
    /// computation.
    pub fn derive_from_password(
        &self,
        password: &[u8],
        record: &VerificationRecord,
    ) -> Result<Handle> {
        let params: KdfParams = record.params.into();
        let mut key_bytes = kdf::derive_key(password, &record.salt, &params)?;
        let key = MasterKey::new(key_bytes);
        key_bytes.zeroize();

        let verifier = key.verifier()?;
        if !bool::from(verifier.as_slice().ct_eq(&record.verifier)) {
            return Err(AuthFailure::BadCredentials.into());
        }

        log::debug!("master key derived from password");
        Ok(self.issue(key))
    }

    /// Obtain a master key from a platform unwrap capability.
    ///
    /// The unwrapped bytes are used as the master key directly; the
    /// platform already gated them behind its own authentication.
    pub fn derive_from_unwrap(&self, capability: &dyn UnwrapCapability) -> Result<Handle> {
        let mut key_bytes = capability.unwrap_key()?;
        let key = MasterKey::new(key_bytes);
        key_bytes.zeroize();

        log::debug!("master key obtained from unwrap capability");
        Ok(self.issue(key))
    }

    fn issue(&self, key: MasterKey) -> Handle {
        let expires_at = self.ttl.map(|ttl| Utc::now() + ttl);
        self.registry.issue(MasterKeyRecord { key, expires_at })
    }

    /// Run `f` against the live master key behind `handle`.
    ///
    /// An expired record is disposed on contact and reported as
    /// `HandleError::Expired`; the key bytes never leave the closure.
    pub(crate) fn with_key<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&MasterKey) -> Result<R>,
    ) -> Result<R> {
        let expired = self
            .registry
            .with_record(handle, |record| {
                matches!(record.expires_at, Some(at) if at <= Utc::now())
            })?;
        if expired {
            self.registry.dispose(handle)?;
            return Err(HandleError::Expired.into());
        }
        self.registry.with_record(handle, |record| f(&record.key))?
    }

    /// Zeroize and invalidate one master key.
    pub fn dispose(&self, handle: Handle) -> Result<()> {
        self.registry.dispose(handle)
    }

    /// Sweep expired records (periodic housekeeping). Expiry is also
    /// enforced on use, so this only reclaims memory earlier.
    pub fn dispose_expired(&self) {
        let now = Utc::now();
        let swept = self
            .registry
            .dispose_where(|record| matches!(record.expires_at, Some(at) if at <= now));
        if swept > 0 {
            log::debug!("swept {swept} expired master keys");
        }
    }

    /// App lock / process teardown: drop every derived key.
    pub fn dispose_all(&self) {
        self.registry.dispose_all();
        log::debug!("all master keys disposed");
    }

    /// Number of live master keys (diagnostics only).
    pub fn live_count(&self) -> usize {
        self.registry.live_count()
    }
}
