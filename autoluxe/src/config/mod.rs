//! Configuration module.
//!
//! All settings come from environment variables (optionally seeded from a
//! `.env` file). Secrets are wrapped in `SecretString` as soon as they are
//! read.

pub mod app;
pub mod backend;
pub mod env;
pub mod search;

pub use app::{AppConfig, Environment};
pub use backend::BackendConfig;
pub use search::SearchConfig;
