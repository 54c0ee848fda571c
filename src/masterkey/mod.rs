pub mod service;

pub use service::{
    KdfProfile, MasterKeyService, StoredKdfParams, UnwrapCapability, VerificationRecord,
};
