//! Diagnostic and logging routes.

use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::get,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::middleware::require_admin;
use crate::api::models::{LoggingConfigResponse, ModuleInfo, UpdateLogFilterRequest};
use crate::api::server::AppState;
use crate::credentials::DiagnosticSnapshot;
use crate::logging::available_modules;

/// Create the debug router.
///
/// The diagnostic snapshot is public but only exists while diagnostics are
/// enabled. Log filter changes require an admin token.
pub fn router(state: AppState) -> Router<AppState> {
    let logging = Router::new()
        .route("/logging", get(get_logging_config).put(update_logging_config))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new()
        .route("/diagnostics", get(get_diagnostics))
        .merge(logging)
}

/// Masked credential state: config presence, candidates, active handle and
/// the retry counters.
async fn get_diagnostics(State(state): State<AppState>) -> ApiResult<Json<DiagnosticSnapshot>> {
    let auth = state
        .admin_auth
        .as_ref()
        .filter(|auth| auth.diagnostics_enabled())
        .ok_or_else(|| ApiError::not_found("Diagnostics are disabled"))?;

    Ok(Json(auth.snapshot().await))
}

fn logging_response(filter: String) -> LoggingConfigResponse {
    LoggingConfigResponse {
        filter,
        available_modules: available_modules()
            .into_iter()
            .map(|(name, description)| ModuleInfo {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect(),
    }
}

async fn get_logging_config(
    State(state): State<AppState>,
) -> ApiResult<Json<LoggingConfigResponse>> {
    let config = state
        .logging_config
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Logging configuration not available"))?;

    Ok(Json(logging_response(config.get_filter())))
}

async fn update_logging_config(
    State(state): State<AppState>,
    Json(request): Json<UpdateLogFilterRequest>,
) -> ApiResult<Json<LoggingConfigResponse>> {
    let config = state
        .logging_config
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Logging configuration not available"))?;

    config.set_filter(&request.filter)?;

    Ok(Json(logging_response(config.get_filter())))
}
