//! REST API server module.
//!
//! Provides HTTP endpoints for the car catalog, search, admin sign-in and
//! credential diagnostics.

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
