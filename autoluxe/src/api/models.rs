//! API request and response models (DTOs).
//!
//! Catalog endpoints return stored documents as-is; the types here cover the
//! admin, health and diagnostic endpoints.

use serde::{Deserialize, Serialize};

use crate::catalog::ReindexOutcome;
use crate::credentials::{AdminLogin, VerifiedUser};

// ============================================================================
// Admin
// ============================================================================

/// `POST /api/admin/login` body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful admin login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    /// Key switches needed before the sign-in went through
    pub retries: u32,
}

impl From<AdminLogin> for LoginResponse {
    fn from(login: AdminLogin) -> Self {
        let credential = login.credential;
        Self {
            uid: credential.uid,
            email: credential.email,
            id_token: credential.id_token,
            refresh_token: credential.refresh_token,
            expires_in: credential.expires_in,
            retries: login.retries,
        }
    }
}

/// `POST /api/admin/auth` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenRequest {
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Authenticated admin identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub uid: String,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl From<VerifiedUser> for AdminUser {
    fn from(user: VerifiedUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            is_admin: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyTokenResponse {
    pub authenticated: bool,
    pub user: AdminUser,
}

// ============================================================================
// Search index maintenance
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ReindexResponse {
    pub message: String,
    pub result: ReindexOutcome,
}

impl From<ReindexOutcome> for ReindexResponse {
    fn from(result: ReindexOutcome) -> Self {
        Self {
            message: result.message(),
            result,
        }
    }
}

/// Generic acknowledgement for write operations.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
}

/// Component health status.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: "healthy".to_string(),
            message: None,
        }
    }

    pub fn unhealthy(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: "unhealthy".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn disabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: "disabled".to_string(),
            message: None,
        }
    }

    pub fn is_unhealthy(&self) -> bool {
        self.status == "unhealthy"
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Request to update the log filter.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLogFilterRequest {
    pub filter: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub description: String,
}

/// Response for logging configuration.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfigResponse {
    pub filter: String,
    pub available_modules: Vec<ModuleInfo>,
}
