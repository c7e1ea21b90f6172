//! Shared utilities.

pub mod http_client;
