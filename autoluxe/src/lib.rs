//! autoluxe library crate.
//!
//! Car-rental storefront backend: catalog and search endpoints, plus admin
//! sign-in against a hosted identity backend with API-key fallback.

pub mod api;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod database;
pub mod error;
pub mod logging;
pub mod panic_hook;
pub mod utils;

pub use error::{Error, Result};
