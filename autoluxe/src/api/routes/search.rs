//! Full-text car search.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::catalog::{Document, SearchOptions};

/// Create the search router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search_cars))
}

/// `GET /api/search?q=..&hitsPerPage=..&page=..&filters=..`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(default)]
    q: String,
    hits_per_page: Option<u32>,
    page: Option<u32>,
    filters: Option<String>,
}

async fn search_cars(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Document>>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    let options = SearchOptions {
        hits_per_page: params.hits_per_page,
        page: params.page,
        filters: params.filters,
    };
    Ok(Json(catalog.search_cars(&params.q, &options).await?))
}
