//! Health check routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::api::error::ApiResult;
use crate::api::models::{ComponentHealth, HealthResponse};
use crate::api::server::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

async fn check_components(state: &AppState) -> Vec<ComponentHealth> {
    let database = match &state.db_pool {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => ComponentHealth::healthy("database"),
            Err(e) => ComponentHealth::unhealthy("database", e.to_string()),
        },
        None => ComponentHealth::disabled("database"),
    };

    let search = match &state.catalog {
        Some(catalog) if catalog.search_available() => ComponentHealth::healthy("search"),
        _ => ComponentHealth::disabled("search"),
    };

    let identity = match &state.admin_auth {
        Some(_) => ComponentHealth::healthy("identity"),
        None => ComponentHealth::disabled("identity"),
    };

    vec![database, search, identity]
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let components = check_components(&state).await;
    let status = if components.iter().any(ComponentHealth::is_unhealthy) {
        "degraded"
    } else {
        "healthy"
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        components,
    }))
}

/// Readiness check - is the service ready to accept traffic?
/// Returns HTTP 200 when the database answers, HTTP 503 otherwise.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let ready = match &state.db_pool {
        Some(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
        None => true,
    };

    if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

/// Liveness check - is the service alive?
async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "uptime_secs": uptime
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_components_without_services() {
        let components = check_components(&AppState::new()).await;
        assert_eq!(components.len(), 3);
        assert!(components.iter().all(|c| c.status == "disabled"));
    }

    #[tokio::test]
    async fn test_database_component_with_pool() {
        let pool = crate::database::init_pool("sqlite::memory:").await.unwrap();
        let state = AppState::new().with_db_pool(pool);

        let components = check_components(&state).await;
        assert_eq!(components[0].name, "database");
        assert_eq!(components[0].status, "healthy");
    }
}
