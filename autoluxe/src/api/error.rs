//! API error handling.
//!
//! Provides consistent error responses for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::credentials::{AdminAuthError, AuthErrorKind, CredentialError};
use crate::error::Error;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 401 Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// Create a 403 Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// Create a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// Create a 503 Service Unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { entity_type, id } => {
                ApiError::not_found(format!("{} with id '{}' not found", entity_type, id))
            }
            Error::Validation(msg) => ApiError::bad_request(msg),
            Error::Configuration(msg) => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "CONFIGURATION_ERROR", msg)
            }
            Error::Credential(e) => e.into(),
            Error::Search(msg) => {
                tracing::error!("Search index error: {}", msg);
                ApiError::new(StatusCode::BAD_GATEWAY, "SEARCH_ERROR", msg)
            }
            Error::DatabaseSqlx(e) => {
                tracing::error!("Database error: {}", e);
                ApiError::internal("Database error occurred")
            }
            Error::Io(e) => {
                tracing::error!("IO error: {}", e);
                ApiError::internal("IO error occurred")
            }
            Error::ApiError(msg) => ApiError::bad_request(msg),
            _ => {
                tracing::error!("Unexpected error: {}", err);
                ApiError::internal("An unexpected error occurred")
            }
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        let code = err.code().to_ascii_uppercase().replace('-', "_");
        let status = match &err {
            CredentialError::Auth { kind, .. } => match kind {
                AuthErrorKind::InvalidIdentifierOrSecret | AuthErrorKind::TokenExpired => {
                    StatusCode::UNAUTHORIZED
                }
                AuthErrorKind::CredentialNotAccepted | AuthErrorKind::ServiceUnavailable => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
            CredentialError::Configuration(_)
            | CredentialError::Exhausted { .. }
            | CredentialError::Connect(_)
            | CredentialError::Release(_) => StatusCode::SERVICE_UNAVAILABLE,
            CredentialError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        };
        ApiError::new(status, code, err.to_string())
    }
}

impl From<AdminAuthError> for ApiError {
    fn from(err: AdminAuthError) -> Self {
        match err {
            AdminAuthError::EmailDomainNotAllowed(_) => ApiError::forbidden(err.to_string()),
            AdminAuthError::MissingToken => ApiError::unauthorized(err.to_string()),
            AdminAuthError::Credential(e) => e.into(),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_creation() {
        let err = ApiError::not_found("Car not found");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(err.message, "Car not found");
    }

    #[test]
    fn test_from_domain_error() {
        let api_err: ApiError = Error::not_found("car", "123").into();
        assert_eq!(api_err.status, StatusCode::NOT_FOUND);
        assert!(api_err.message.contains("123"));

        let api_err: ApiError = Error::validation("Invalid category type: x").into();
        assert_eq!(api_err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_credential_error_mapping() {
        let wrong_password: ApiError = CredentialError::auth(
            AuthErrorKind::InvalidIdentifierOrSecret,
            "INVALID_PASSWORD",
            "INVALID_PASSWORD",
        )
        .into();
        assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.code, "INVALID_IDENTIFIER_OR_SECRET");
        assert_eq!(wrong_password.message, "INVALID_PASSWORD");

        let exhausted: ApiError = CredentialError::Exhausted {
            retries: 1,
            last_error: "API key not valid.".into(),
        }
        .into();
        assert_eq!(exhausted.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(exhausted.code, "CANDIDATES_EXHAUSTED");
    }

    #[test]
    fn test_admin_error_mapping() {
        let forbidden: ApiError =
            AdminAuthError::EmailDomainNotAllowed("autoluxe.com".into()).into();
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let missing: ApiError = AdminAuthError::MissingToken.into();
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    }
}
