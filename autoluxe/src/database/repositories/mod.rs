//! Repository layer for database access.

pub mod document;

pub use document::SqlxDocumentStore;
