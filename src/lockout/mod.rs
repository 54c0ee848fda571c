pub mod destruction;
pub mod guard;

pub use destruction::{DestructionCoordinator, DuressRecord};
pub use guard::{AttemptOutcome, CooldownPolicy, LockoutGuard, LockoutState};
