//! Brand routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::catalog::{BrandFilters, Document};

/// Create the brands router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_brands))
        .route("/featured", get(featured_brands))
}

async fn list_brands(
    State(state): State<AppState>,
    Query(filters): Query<BrandFilters>,
) -> ApiResult<Json<Vec<Document>>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    Ok(Json(catalog.list_brands(&filters).await?))
}

async fn featured_brands(State(state): State<AppState>) -> ApiResult<Json<Vec<Document>>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    let filters = BrandFilters {
        featured: Some("true".to_string()),
    };
    Ok(Json(catalog.list_brands(&filters).await?))
}
