//! Car catalog routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::catalog::{CarFilters, Document};

/// Create the cars router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cars))
        .route("/featured", get(featured_cars))
        .route("/{id}", get(get_car))
}

/// List cars matching the query filters.
///
/// `GET /api/cars?featured=true&brand=..&category=..&minPrice=..&maxPrice=..&type=..&tag=..&fuelType=..`
async fn list_cars(
    State(state): State<AppState>,
    Query(filters): Query<CarFilters>,
) -> ApiResult<Json<Vec<Document>>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    Ok(Json(catalog.list_cars(&filters).await?))
}

async fn featured_cars(State(state): State<AppState>) -> ApiResult<Json<Vec<Document>>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    Ok(Json(catalog.featured_cars().await?))
}

async fn get_car(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    Ok(Json(catalog.get_car(&id).await?))
}
