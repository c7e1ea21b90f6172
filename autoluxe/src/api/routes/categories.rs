//! Category routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::catalog::{CategoryFilters, CategoryType, Document};

/// Create the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/featured", get(featured_categories))
        .route("/type", get(categories_by_type_query))
        .route("/{type}", get(categories_by_type_path))
}

#[derive(Debug, Deserialize)]
struct TypeQuery {
    #[serde(rename = "type")]
    category_type: Option<String>,
}

async fn list_categories(
    State(state): State<AppState>,
    Query(filters): Query<CategoryFilters>,
) -> ApiResult<Json<Vec<Document>>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    Ok(Json(catalog.list_categories(&filters).await?))
}

async fn featured_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Document>>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    let filters = CategoryFilters {
        featured: Some("true".to_string()),
        category_type: None,
    };
    Ok(Json(catalog.list_categories(&filters).await?))
}

/// `GET /api/categories/type?type=carType`
async fn categories_by_type_query(
    State(state): State<AppState>,
    Query(query): Query<TypeQuery>,
) -> ApiResult<Json<Vec<Document>>> {
    let raw = query
        .category_type
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required query parameter: type"))?;

    categories_by_type(&state, &raw).await
}

/// `GET /api/categories/carType`
async fn categories_by_type_path(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Vec<Document>>> {
    categories_by_type(&state, &raw).await
}

async fn categories_by_type(state: &AppState, raw: &str) -> ApiResult<Json<Vec<Document>>> {
    let category_type = CategoryType::parse_param(raw)?;
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    Ok(Json(catalog.categories_by_type(category_type).await?))
}
