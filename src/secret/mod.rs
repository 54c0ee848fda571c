pub mod record;
pub mod root;
pub mod store;
pub mod validate;

pub use record::{SecretKind, SecretRecord, ValidationReport};
pub use store::SecretStore;
