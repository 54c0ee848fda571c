//! The secret store: ingest, validation, and the one-shot transition
//! into an encrypted payload.
//!
//! A `SecretRecord` holds the only plaintext copy of an ingested
//! secret. It leaves the store exactly once — either consumed by
//! `export_for_encryption`, which disposes the handle in the same
//! operation, or cancelled.

use crate::config::Settings;
use crate::crypto::kdf::KdfParams;
use crate::crypto::keys::MasterKey;
use crate::errors::{Result, ValidationError};
use crate::handle::{Handle, HandleKind, HandleRegistry};
use crate::payload::WalletPayload;
use crate::secret::record::{SecretEnvelope, SecretKind, SecretRecord, ValidationReport};
use crate::secret::root::{self, RootKey};
use crate::secret::validate::{self, PhrasePolicy};

pub struct SecretStore {
    registry: HandleRegistry<SecretRecord>,
    policy: PhrasePolicy,
    vault_params: KdfParams,
}

impl SecretStore {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            registry: HandleRegistry::new(HandleKind::Secret),
            policy: PhrasePolicy::from_settings(settings)?,
            vault_params: settings.vault_kdf_params(),
        })
    }

    /// Validate and store secret material, returning a handle and the
    /// validation metadata.
    ///
    /// The input bytes are stored exactly as given, so a later reveal
    /// round-trips byte-for-byte. On failure nothing is retained.
    pub fn ingest(&self, bytes: &[u8], kind: SecretKind) -> Result<(Handle, ValidationReport)> {
        if bytes.is_empty() {
            return Err(ValidationError::Empty.into());
        }

        let entropy_bits = match kind {
            SecretKind::Mnemonic => {
                let text = std::str::from_utf8(bytes).map_err(|_| ValidationError::NotUtf8)?;
                validate::validate_mnemonic(text)?
            }
            SecretKind::PrivateKey => {
                validate::parse_private_key(bytes)?;
                256.0
            }
            SecretKind::CustomPhrase => {
                let text = std::str::from_utf8(bytes).map_err(|_| ValidationError::NotUtf8)?;
                self.policy.check(text)?
            }
            SecretKind::Raw => {
                if !(16..=64).contains(&bytes.len()) {
                    return Err(ValidationError::BadRawLength {
                        min: 16,
                        max: 64,
                        got: bytes.len(),
                    }
                    .into());
                }
                (bytes.len() * 8) as f64
            }
        };

        let report = ValidationReport {
            kind,
            valid: true,
            reason: None,
            entropy_bits,
        };
        let record = SecretRecord::new(kind, bytes.to_vec(), report.clone());
        let handle = self.registry.issue(record);
        Ok((handle, report))
    }

    /// The validation metadata recorded at ingest time.
    pub fn report(&self, handle: Handle) -> Result<ValidationReport> {
        self.registry.with_record(handle, |r| r.report.clone())
    }

    /// Build the derivable root key for the secret behind `handle`.
    ///
    /// The secret stays in the store; sessions capture the root, not
    /// the secret itself.
    pub(crate) fn root_key(&self, handle: Handle) -> Result<RootKey> {
        let (kind, bytes) = self.registry.with_record(handle, |r| {
            (r.kind, zeroize::Zeroizing::new(r.bytes().to_vec()))
        })?;
        root::root_key_for(kind, &bytes, &self.vault_params)
    }

    /// One-shot Secret → Consumed transition.
    ///
    /// Encrypts the secret envelope under `master`, zeroizes the record
    /// and invalidates the handle. The returned payload is the only
    /// remaining form of the secret.
    pub fn export_for_encryption(
        &self,
        handle: Handle,
        master: &MasterKey,
    ) -> Result<WalletPayload> {
        let mut record = self.registry.take(handle)?;
        let envelope = SecretEnvelope {
            kind: record.kind,
            data: record.bytes().to_vec(),
        };
        zeroize::Zeroize::zeroize(&mut record);

        let json = envelope.to_json()?;
        WalletPayload::seal(master, &json)
    }

    /// Abandon an ingested secret without exporting it.
    pub fn cancel(&self, handle: Handle) -> Result<()> {
        self.registry.dispose(handle)
    }

    /// Process-teardown sweep.
    pub fn dispose_all(&self) {
        self.registry.dispose_all();
    }

    /// Number of live secret records (diagnostics only).
    pub fn live_count(&self) -> usize {
        self.registry.live_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CoreError, HandleError};

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn store() -> SecretStore {
        let mut settings = Settings::default();
        // Keep the heavy profile cheap for tests.
        settings.vault_memory_kib = 8_192;
        settings.vault_iterations = 1;
        SecretStore::new(&settings).unwrap()
    }

    #[test]
    fn ingest_valid_mnemonic() {
        let store = store();
        let (handle, report) = store
            .ingest(MNEMONIC.as_bytes(), SecretKind::Mnemonic)
            .unwrap();
        assert!(report.valid);
        assert_eq!(report.entropy_bits, 128.0);
        assert_eq!(store.report(handle).unwrap().kind, SecretKind::Mnemonic);
    }

    #[test]
    fn invalid_input_retains_nothing() {
        let store = store();
        assert!(store.ingest(b"not a mnemonic", SecretKind::Mnemonic).is_err());
        assert!(store.ingest(b"short", SecretKind::CustomPhrase).is_err());
        assert!(store.ingest(&[0u8; 4], SecretKind::Raw).is_err());
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn export_consumes_the_handle() {
        let store = store();
        let (handle, _) = store
            .ingest(MNEMONIC.as_bytes(), SecretKind::Mnemonic)
            .unwrap();

        let master = MasterKey::new([0x77u8; 32]);
        let payload = store.export_for_encryption(handle, &master).unwrap();
        assert!(!payload.ciphertext.is_empty());
        assert_eq!(store.live_count(), 0);

        // Handle is dead after the one-shot transition.
        assert!(matches!(
            store.report(handle),
            Err(CoreError::Handle(HandleError::Stale))
        ));
        assert!(matches!(
            store.export_for_encryption(handle, &master),
            Err(CoreError::Handle(HandleError::Stale))
        ));
    }

    #[test]
    fn exported_payload_reveals_original_bytes() {
        let store = store();
        let (handle, _) = store
            .ingest(MNEMONIC.as_bytes(), SecretKind::Mnemonic)
            .unwrap();

        let master = MasterKey::new([0x77u8; 32]);
        let payload = store.export_for_encryption(handle, &master).unwrap();

        let json = payload.open(&master).unwrap();
        let envelope = SecretEnvelope::from_json(&json).unwrap();
        assert_eq!(envelope.kind, SecretKind::Mnemonic);
        assert_eq!(envelope.data, MNEMONIC.as_bytes());
    }

    #[test]
    fn cancel_is_idempotent() {
        let store = store();
        let (handle, _) = store.ingest(&[0xAB; 32], SecretKind::Raw).unwrap();
        store.cancel(handle).unwrap();
        store.cancel(handle).unwrap();
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn root_key_leaves_secret_in_store() {
        let store = store();
        let (handle, _) = store
            .ingest(MNEMONIC.as_bytes(), SecretKind::Mnemonic)
            .unwrap();
        let _root = store.root_key(handle).unwrap();
        assert_eq!(store.live_count(), 1);
    }
}
