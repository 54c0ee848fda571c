pub mod registry;

pub use registry::{Handle, HandleKind, HandleRegistry};
