//! Backend implementations.

pub mod identity;

pub use identity::{IdentityConnector, IdentitySession};
