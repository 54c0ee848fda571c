//! Secrets-handling and signing core for a mobile multi-chain wallet.
//!
//! Plaintext mnemonics, private keys, and derived master keys live
//! behind opaque handles inside this crate; the orchestration/UI layer
//! only ever sees handles, addresses, public-key summaries, and
//! encoded payload strings. `core::WalletCore` is the boundary facade.

pub mod config;
pub mod core;
pub mod crypto;
pub mod errors;
pub mod handle;
pub mod lockout;
pub mod masterkey;
pub mod payload;
pub mod secret;
pub mod session;
pub mod store;

pub use crate::config::Settings;
pub use crate::core::{Signature, TxRequest, WalletCore};
pub use crate::errors::{AuthFailure, CoreError, FormatError, HandleError, Result, ValidationError};
pub use crate::handle::{Handle, HandleKind};
pub use crate::lockout::{AttemptOutcome, LockoutState};
pub use crate::masterkey::{KdfProfile, UnwrapCapability, VerificationRecord};
pub use crate::secret::{SecretKind, ValidationReport};
pub use crate::session::{AddressInfo, Chain};
pub use crate::store::{MemoryStore, ProtectedStore};
