//! The boundary facade.
//!
//! `WalletCore` is the single entry point the orchestration/UI layer
//! talks to. It is an explicit process-scoped service: constructed at
//! startup with its settings, its protected store, and the active
//! profile id, torn down explicitly — never an ambient global. Only
//! handles, addresses, summaries, and encoded payload strings cross
//! the boundary; raw secret and key bytes never do.
//!
//! Every unlock path is gated by the lockout guard, with the duress
//! check first — a duress match destroys the profile immediately,
//! whatever the cooldown state.

use std::sync::Arc;

use chrono::Utc;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::kdf::KdfParams;
use crate::errors::{AuthFailure, CoreError, Result};
use crate::handle::Handle;
use crate::lockout::{AttemptOutcome, CooldownPolicy, DestructionCoordinator, DuressRecord, LockoutGuard};
use crate::masterkey::{KdfProfile, MasterKeyService, UnwrapCapability, VerificationRecord};
use crate::payload::{VaultPayload, WalletPayload};
use crate::secret::record::{SecretEnvelope, SecretKind, ValidationReport};
use crate::secret::root;
use crate::secret::SecretStore;
use crate::session::{AddressInfo, Chain, SessionStore};
use crate::store::{record_keys, ProtectedStore};

/// What the boundary caller asks the core to authorize: the chain, the
/// derivation path, and the exact bytes to sign. Transaction assembly
/// and broadcast live outside the core.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub chain: Chain,
    pub path: String,
    pub message: Vec<u8>,
}

/// A produced signature. Scheme and length are chain-specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub chain: Chain,
    pub bytes: Vec<u8>,
}

impl Signature {
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

pub struct WalletCore {
    secrets: SecretStore,
    sessions: SessionStore,
    master_keys: MasterKeyService,
    guard: LockoutGuard,
    destruction: DestructionCoordinator,
    store: Arc<dyn ProtectedStore>,
    profile: String,
    session_chains: Vec<Chain>,
    vault_params: KdfParams,
}

impl WalletCore {
    /// Construct the core for one wallet profile.
    pub fn new(
        settings: Settings,
        store: Arc<dyn ProtectedStore>,
        profile: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            secrets: SecretStore::new(&settings)?,
            sessions: SessionStore::new(),
            master_keys: MasterKeyService::new(&settings),
            guard: LockoutGuard::new(
                Arc::clone(&store),
                CooldownPolicy::from_settings(&settings),
            ),
            destruction: DestructionCoordinator::new(Arc::clone(&store)),
            store,
            profile: profile.into(),
            session_chains: settings.session_chains.clone(),
            vault_params: settings.vault_kdf_params(),
        })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    // ------------------------------------------------------------------
    // Enrollment
    // ------------------------------------------------------------------

    /// Enroll the unlock password (and optionally a duress PIN) for
    /// this profile. Persists the verification and duress records.
    pub fn enroll(&self, password: &[u8], duress_pin: Option<&[u8]>) -> Result<()> {
        self.fail_if_destroyed()?;

        let record = self
            .master_keys
            .create_verification_record(password, KdfProfile::Unlock)?;
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| CoreError::SerializationError(format!("verification record: {e}")))?;
        self.store
            .put(&self.profile, record_keys::VERIFICATION, &bytes)?;

        if let Some(pin) = duress_pin {
            self.destruction
                .set_duress_record(&self.profile, &DuressRecord::from_pin(pin))?;
        }
        Ok(())
    }

    /// Pre-provision decoy payload entries, substituted for the real
    /// set if this profile is ever destroyed.
    pub fn provision_decoy(&self, entries: &[(String, String)]) -> Result<()> {
        for (name, payload) in entries {
            self.store.put(
                &self.profile,
                &record_keys::decoy(&record_keys::payload(name)),
                payload.as_bytes(),
            )?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Secret ingest and sessions
    // ------------------------------------------------------------------

    /// Validate and take ownership of secret material. The caller must
    /// not retain the input bytes after this returns.
    pub fn ingest_secret(
        &self,
        bytes: &[u8],
        kind: SecretKind,
    ) -> Result<(Handle, ValidationReport)> {
        self.secrets.ingest(bytes, kind)
    }

    /// Abandon an ingested secret.
    pub fn cancel_secret(&self, handle: Handle) -> Result<()> {
        self.secrets.cancel(handle)
    }

    /// Open a derivation session over an ingested secret and derive
    /// addresses for the configured chain set.
    ///
    /// The root key is cleared eagerly once those derivations are
    /// cached; the addresses stay available for the session's lifetime.
    pub fn derive_session(&self, secret: Handle) -> Result<(Handle, Vec<AddressInfo>)> {
        let root = self.secrets.root_key(secret)?;
        let session = self.sessions.create(root, Some(secret));

        let mut addresses = Vec::with_capacity(self.session_chains.len());
        for &chain in &self.session_chains {
            let path = chain.default_path(0);
            match self.sessions.derive_address(session, chain, &path) {
                Ok(info) => addresses.push(info),
                Err(e) => {
                    // Don't leave a root-bearing session behind on a
                    // failed derivation.
                    let _ = self.sessions.dispose(session);
                    return Err(e);
                }
            }
        }
        self.sessions.seal(session)?;

        Ok((session, addresses))
    }

    /// Address for one cached (chain, path) derivation of a session.
    pub fn session_address(&self, session: Handle, chain: Chain, path: &str) -> Result<AddressInfo> {
        self.sessions.derive_address(session, chain, path)
    }

    /// End a session without finalizing.
    pub fn dispose_session(&self, session: Handle) -> Result<()> {
        self.sessions.dispose(session)
    }

    // ------------------------------------------------------------------
    // Unlock
    // ------------------------------------------------------------------

    /// Unlock with a password or PIN.
    ///
    /// Order matters: the duress check runs first and fires from any
    /// state, then the cooldown gate, then the real verification. A
    /// wrong credential is counted before the error is returned.
    pub fn unlock_password(&self, password: &[u8]) -> Result<Handle> {
        self.fail_if_destroyed()?;

        if self.destruction.check_duress(&self.profile, password)? {
            self.destruction.destroy(&self.profile)?;
            self.master_keys.dispose_all();
            return Err(CoreError::DestructionTriggered);
        }

        self.guard.ensure_allowed(&self.profile, Utc::now())?;

        let record = self.verification_record()?;
        match self.master_keys.derive_from_password(password, &record) {
            Ok(handle) => {
                self.guard.record_success(&self.profile)?;
                Ok(handle)
            }
            Err(CoreError::Auth(AuthFailure::BadCredentials)) => {
                match self.guard.record_failure(&self.profile, Utc::now())? {
                    AttemptOutcome::DestroyThresholdReached => {
                        self.destruction.destroy(&self.profile)?;
                        self.master_keys.dispose_all();
                        Err(CoreError::DestructionTriggered)
                    }
                    AttemptOutcome::Recorded { .. } => Err(AuthFailure::BadCredentials.into()),
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Unlock through a platform unwrap capability (biometric path).
    /// Success resets the lockout state like a password unlock.
    pub fn unlock_with_capability(&self, capability: &dyn UnwrapCapability) -> Result<Handle> {
        self.fail_if_destroyed()?;
        self.guard.ensure_allowed(&self.profile, Utc::now())?;

        let handle = self.master_keys.derive_from_unwrap(capability)?;
        self.guard.record_success(&self.profile)?;
        Ok(handle)
    }

    /// Dispose one master key handle.
    pub fn dispose_master_key(&self, handle: Handle) -> Result<()> {
        self.master_keys.dispose(handle)
    }

    /// App lock: every derived master key is zeroized.
    pub fn lock(&self) {
        self.master_keys.dispose_all();
    }

    /// Process teardown: drop all in-memory secret state.
    pub fn teardown(&self) {
        self.secrets.dispose_all();
        self.sessions.dispose_all();
        self.master_keys.dispose_all();
    }

    // ------------------------------------------------------------------
    // Finalize / reveal / sign
    // ------------------------------------------------------------------

    /// Finalize wallet creation: consume the session's originating
    /// secret into an encrypted payload, persist it, and end the
    /// session. Returns the serialized `W1` payload.
    pub fn finalize(&self, session: Handle, master: Handle) -> Result<String> {
        self.fail_if_destroyed()?;

        let origin = self
            .sessions
            .origin(session)?
            .ok_or_else(|| CoreError::StoreError("session has no originating secret".into()))?;

        let payload = self
            .master_keys
            .with_key(master, |key| self.secrets.export_for_encryption(origin, key))?;
        let encoded = payload.encode();

        self.store.put(
            &self.profile,
            &record_keys::payload("wallet"),
            encoded.as_bytes(),
        )?;
        self.sessions.dispose(session)?;

        Ok(encoded)
    }

    /// The persisted wallet payload for this profile, if any.
    pub fn stored_payload(&self) -> Result<Option<String>> {
        match self
            .store
            .get(&self.profile, &record_keys::payload("wallet"))?
        {
            Some(bytes) => Ok(Some(String::from_utf8(bytes).map_err(|_| {
                CoreError::SerializationError("stored payload is not UTF-8".into())
            })?)),
            None => Ok(None),
        }
    }

    /// Decrypt a wallet payload for display inside the trusted screen.
    ///
    /// The caller renders the bytes and drops them; they are never
    /// persisted on the other side of the boundary.
    pub fn decrypt_reveal(&self, payload: &str, master: Handle) -> Result<Zeroizing<Vec<u8>>> {
        let decoded = WalletPayload::decode(payload)?;
        let json = self.master_keys.with_key(master, |key| decoded.open(key))?;
        let envelope = SecretEnvelope::from_json(&json)?;
        Ok(Zeroizing::new(envelope.data.clone()))
    }

    /// Sign a transaction with the key derived from a wallet payload.
    ///
    /// The payload is decrypted, the chain key derived, the signature
    /// produced, and every intermediate zeroized — nothing but the
    /// signature crosses back.
    pub fn sign(&self, payload: &str, tx: &TxRequest, master: Handle) -> Result<Signature> {
        let decoded = WalletPayload::decode(payload)?;
        let json = self.master_keys.with_key(master, |key| decoded.open(key))?;
        let envelope = SecretEnvelope::from_json(&json)?;

        let root = root::root_key_for(envelope.kind, &envelope.data, &self.vault_params)?;
        let private = tx.chain.derive_key(&root, &tx.path)?;
        let bytes = tx.chain.sign(&private, &tx.message)?;

        Ok(Signature {
            chain: tx.chain,
            bytes,
        })
    }

    // ------------------------------------------------------------------
    // Vault text
    // ------------------------------------------------------------------

    /// Encrypt ad-hoc text directly under a password (vault profile
    /// costs). No master key involved.
    pub fn vault_encrypt(&self, plaintext: &[u8], password: &[u8]) -> Result<String> {
        Ok(VaultPayload::seal(plaintext, password, &self.vault_params)?.encode())
    }

    /// Decrypt a vault payload with its own embedded KDF costs.
    pub fn vault_decrypt(&self, payload: &str, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        VaultPayload::decode(payload)?.open(password)
    }

    // ------------------------------------------------------------------
    // Lockout and destruction
    // ------------------------------------------------------------------

    /// Count a failed attempt from an external credential check. May
    /// destroy the profile when the threshold is reached.
    pub fn record_failed_attempt(&self) -> Result<AttemptOutcome> {
        match self.guard.record_failure(&self.profile, Utc::now())? {
            AttemptOutcome::DestroyThresholdReached => {
                self.destruction.destroy(&self.profile)?;
                self.master_keys.dispose_all();
                Err(CoreError::DestructionTriggered)
            }
            outcome => Ok(outcome),
        }
    }

    /// Reset the failure counter after an external success.
    pub fn record_success(&self) -> Result<()> {
        self.guard.record_success(&self.profile)
    }

    /// Current lockout state for this profile.
    pub fn lockout_state(&self) -> Result<crate::lockout::LockoutState> {
        self.guard.state(&self.profile)
    }

    /// Erase the persisted payload set for a profile. Terminal.
    pub fn destroy(&self, profile: &str) -> Result<()> {
        self.destruction.destroy(profile)?;
        if profile == self.profile {
            self.master_keys.dispose_all();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn fail_if_destroyed(&self) -> Result<()> {
        if self.destruction.is_destroyed(&self.profile)? {
            return Err(CoreError::DestructionTriggered);
        }
        Ok(())
    }

    fn verification_record(&self) -> Result<VerificationRecord> {
        let bytes = self
            .store
            .get(&self.profile, record_keys::VERIFICATION)?
            .ok_or_else(|| {
                CoreError::StoreError("no verification record enrolled for profile".into())
            })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::SerializationError(format!("verification record: {e}")))
    }
}
