//! Derivation sessions: a root key plus a per-(chain, path) cache.
//!
//! A session is created from an ingested secret, hands out addresses
//! and signatures, and never exposes key bytes. Derivation and signing
//! on one session are serialized by the registry lock, so the cache is
//! never mutated concurrently.
//!
//! Root key material is cleared eagerly: once the caller has derived
//! everything it needs it calls `seal`, which drops the root but keeps
//! the cache. Cached addresses keep working; new derivations fail.

use std::collections::HashMap;

use zeroize::{Zeroize, Zeroizing};

use crate::errors::{HandleError, Result};
use crate::handle::{Handle, HandleKind, HandleRegistry};
use crate::secret::root::RootKey;
use crate::session::chain::{AddressInfo, Chain};

struct CachedKey {
    private: Zeroizing<[u8; 32]>,
    info: AddressInfo,
}

/// One derivation session.
pub struct SessionRecord {
    root: Option<RootKey>,
    /// Handle of the secret this session was derived from, if any.
    origin: Option<Handle>,
    cache: HashMap<(Chain, String), CachedKey>,
}

impl Zeroize for SessionRecord {
    fn zeroize(&mut self) {
        // RootKey and CachedKey.private both zeroize on drop.
        self.root = None;
        self.cache.clear();
    }
}

impl std::fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecord")
            .field("sealed", &self.root.is_none())
            .field("cached", &self.cache.len())
            .finish()
    }
}

pub struct SessionStore {
    registry: HandleRegistry<SessionRecord>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            registry: HandleRegistry::new(HandleKind::Session),
        }
    }

    /// Open a session over root key material.
    pub fn create(&self, root: RootKey, origin: Option<Handle>) -> Handle {
        self.registry.issue(SessionRecord {
            root: Some(root),
            origin,
            cache: HashMap::new(),
        })
    }

    /// Derive (or fetch from cache) the address for `(chain, path)`.
    ///
    /// Never returns private key bytes. After `seal`, only cached
    /// entries resolve.
    pub fn derive_address(&self, handle: Handle, chain: Chain, path: &str) -> Result<AddressInfo> {
        self.registry.with_record_mut(handle, |record| {
            let key = (chain, path.to_string());
            if let Some(cached) = record.cache.get(&key) {
                return Ok(cached.info.clone());
            }

            let root = record.root.as_ref().ok_or(HandleError::Sealed)?;
            let private = chain.derive_key(root, path)?;
            let info = chain.address_info(&private)?;
            record.cache.insert(
                key,
                CachedKey {
                    private,
                    info: info.clone(),
                },
            );
            Ok(info)
        })?
    }

    /// Sign `message` with the session's key for `(chain, path)`.
    ///
    /// The signing key is derived (or read from the cache) and used
    /// entirely inside the registry lock; it is never a return value.
    pub fn sign(&self, handle: Handle, chain: Chain, path: &str, message: &[u8]) -> Result<Vec<u8>> {
        self.registry.with_record_mut(handle, |record| {
            let key = (chain, path.to_string());
            if let Some(cached) = record.cache.get(&key) {
                return chain.sign(&cached.private, message);
            }

            let root = record.root.as_ref().ok_or(HandleError::Sealed)?;
            let private = chain.derive_key(root, path)?;
            let signature = chain.sign(&private, message);
            let info = chain.address_info(&private)?;
            record.cache.insert(key, CachedKey { private, info });
            signature
        })?
    }

    /// Eagerly clear the root key material, keeping the cache.
    pub fn seal(&self, handle: Handle) -> Result<()> {
        self.registry.with_record_mut(handle, |record| {
            record.root = None;
        })
    }

    /// The secret handle this session was derived from.
    pub fn origin(&self, handle: Handle) -> Result<Option<Handle>> {
        self.registry.with_record(handle, |record| record.origin)
    }

    /// End the session, zeroizing the root and every cached key.
    pub fn dispose(&self, handle: Handle) -> Result<()> {
        self.registry.dispose(handle)
    }

    /// Process-teardown sweep.
    pub fn dispose_all(&self) {
        self.registry.dispose_all();
    }

    /// Number of live sessions (diagnostics only).
    pub fn live_count(&self) -> usize {
        self.registry.live_count()
    }
}
