//! API route modules.
//!
//! Organizes routes by resource type.

pub mod admin;
pub mod brands;
pub mod cars;
pub mod categories;
pub mod debug;
pub mod health;
pub mod search;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/cars", cars::router())
        .nest("/api/brands", brands::router())
        .nest("/api/categories", categories::router())
        .nest("/api/search", search::router())
        .nest("/api/admin", admin::router(state.clone()))
        .nest("/api/reindex", admin::reindex_router())
        .nest("/api/debug", debug::router(state.clone()))
        .nest("/api/health", health::router())
        .with_state(state)
}
