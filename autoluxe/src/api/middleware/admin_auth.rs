//! Admin bearer-token middleware.
//!
//! Verifies the ID token from the `Authorization` header against the identity
//! backend and injects the verified user into request extensions.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::error::ApiError;
use crate::api::server::AppState;

/// Extract Bearer token from Authorization header.
fn extract_bearer_token(request: &Request) -> Result<&str, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing authorization token"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid token format"))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid token format"))
}

/// Require an admin ID token.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = state
        .admin_auth
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Authentication service unavailable"))?;

    let token = extract_bearer_token(&request)?.to_owned();
    let user = auth.verify_admin(&token).await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
