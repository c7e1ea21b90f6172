//! Admin routes: sign-in, token verification and search index maintenance.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    routing::{get, post, put},
};
use serde_json::json;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::middleware::require_admin;
use crate::api::models::{
    AdminUser, LoginRequest, LoginResponse, MessageResponse, ReindexResponse,
    VerifyTokenRequest, VerifyTokenResponse,
};
use crate::api::server::AppState;
use crate::credentials::VerifiedUser;

/// Create the admin router.
///
/// `/login` and `/auth` are public; everything else requires an admin
/// bearer token.
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(current_admin))
        .route("/search/configure", post(configure_search_index))
        .route(
            "/search/cars/{id}",
            put(index_car).delete(remove_car_from_index),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new()
        .route("/login", post(login))
        .route("/auth", post(verify_token))
        .merge(protected)
}

/// Create the reindex router, mounted at `/api/reindex`.
pub fn reindex_router() -> Router<AppState> {
    Router::new().route("/", get(reindex))
}

/// Admin sign-in with email and password.
///
/// On failure the error body carries a diagnostic snapshot under
/// `details.diagnostics` when diagnostics are enabled.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let auth = state
        .admin_auth
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Authentication service unavailable"))?;

    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    match auth
        .login(&request.email, &request.password, &state.shutdown)
        .await
    {
        Ok(login) => Ok(Json(login.into())),
        Err(failure) => {
            let mut error = ApiError::from(failure.error);
            if let Some(snapshot) = failure.snapshot {
                error = error.with_details(json!({ "diagnostics": snapshot }));
            }
            Err(error)
        }
    }
}

/// Verify an ID token and confirm it belongs to an admin.
async fn verify_token(
    State(state): State<AppState>,
    Json(request): Json<VerifyTokenRequest>,
) -> ApiResult<Json<VerifyTokenResponse>> {
    let id_token = request
        .id_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No ID token provided"))?;

    let auth = state
        .admin_auth
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Authentication service unavailable"))?;

    let user = auth.verify_admin(&id_token).await?;

    Ok(Json(VerifyTokenResponse {
        authenticated: true,
        user: user.into(),
    }))
}

async fn current_admin(Extension(user): Extension<VerifiedUser>) -> Json<AdminUser> {
    Json(user.into())
}

/// Rebuild the search index from the car collection. Not available in
/// production.
async fn reindex(State(state): State<AppState>) -> ApiResult<Json<ReindexResponse>> {
    if state.environment.is_production() {
        return Err(ApiError::forbidden("Not available in production"));
    }

    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    info!("Starting reindexing process");
    let outcome = catalog.reindex().await?;
    info!(outcome = ?outcome, "Reindexing finished");

    Ok(Json(outcome.into()))
}

async fn index_car(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    catalog.index_car(&id).await?;
    Ok(Json(MessageResponse::new(format!("Car {} indexed", id))))
}

async fn remove_car_from_index(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    catalog.remove_car_from_index(&id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Car {} removed from index",
        id
    ))))
}

async fn configure_search_index(
    State(state): State<AppState>,
) -> ApiResult<Json<MessageResponse>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Catalog service not available"))?;

    catalog.configure_search_index().await?;
    Ok(Json(MessageResponse::new("Search index configured")))
}
