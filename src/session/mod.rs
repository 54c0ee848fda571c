pub mod chain;
pub mod derive;
pub mod store;

pub use chain::{AddressInfo, Chain};
pub use store::SessionStore;
