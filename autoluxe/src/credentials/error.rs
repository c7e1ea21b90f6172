//! Credential error types.

use serde::Serialize;
use thiserror::Error;

/// Client-SDK code the hosted identity service reports for a rejected API key.
pub const SDK_API_KEY_NOT_VALID: &str = "auth/api-key-not-valid.-please-pass-a-valid-api-key.";

/// Classification of a failed authentication call.
///
/// Only [`AuthErrorKind::CredentialNotAccepted`] triggers a switch to the
/// next candidate key; every other kind is reported to the caller as is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AuthErrorKind {
    /// The API key itself was refused by the service.
    CredentialNotAccepted,
    /// Wrong email, wrong password, disabled or unknown account.
    InvalidIdentifierOrSecret,
    /// The presented ID token is expired or no longer valid.
    TokenExpired,
    /// Transport failure, 5xx, throttling or an unreadable response.
    ServiceUnavailable,
}

impl AuthErrorKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CredentialNotAccepted)
    }

    /// Classify a structured error code.
    ///
    /// Accepts both the REST error reasons / message codes of the identity
    /// API (`API_KEY_INVALID`, `INVALID_PASSWORD`, ...) and the client-SDK
    /// codes (`auth/wrong-password`, ...). Unknown codes are treated as a
    /// service-side failure.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "API_KEY_INVALID" | "keyInvalid" | SDK_API_KEY_NOT_VALID | "auth/invalid-api-key" => {
                Self::CredentialNotAccepted
            }
            "INVALID_PASSWORD"
            | "EMAIL_NOT_FOUND"
            | "INVALID_LOGIN_CREDENTIALS"
            | "INVALID_EMAIL"
            | "MISSING_PASSWORD"
            | "USER_DISABLED"
            | "auth/wrong-password"
            | "auth/user-not-found"
            | "auth/invalid-credential"
            | "auth/invalid-email"
            | "auth/user-disabled" => Self::InvalidIdentifierOrSecret,
            "TOKEN_EXPIRED"
            | "INVALID_ID_TOKEN"
            | "USER_NOT_FOUND"
            | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN"
            | "auth/id-token-expired"
            | "auth/id-token-revoked"
            | "auth/argument-error" => Self::TokenExpired,
            _ => Self::ServiceUnavailable,
        }
    }
}

/// Errors that can occur while establishing a backend session or signing in.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Required settings are missing. Fatal; never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The authentication call failed. The message is the provider's, unchanged.
    #[error("{message}")]
    Auth {
        kind: AuthErrorKind,
        code: String,
        message: String,
    },

    /// Every candidate key was refused.
    #[error(
        "All authentication attempts failed after {retries} retries. Please check the API key configuration."
    )]
    Exhausted { retries: u32, last_error: String },

    /// The caller aborted the login sequence.
    #[error("Login sequence cancelled")]
    Cancelled,

    /// A session handle could not be constructed for a candidate.
    #[error("Session construction failed: {0}")]
    Connect(String),

    /// A session handle could not be released.
    #[error("Session release failed: {0}")]
    Release(String),
}

impl CredentialError {
    pub fn auth(kind: AuthErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Auth {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Classification, for authentication failures only.
    pub fn kind(&self) -> Option<AuthErrorKind> {
        match self {
            Self::Auth { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check if this error should advance to the next candidate key.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(|kind| kind.is_retryable())
    }

    /// Stable code for programmatic handling by API clients.
    pub fn code(&self) -> &str {
        match self {
            Self::Configuration(_) => "configuration-error",
            Self::Auth { kind, .. } => kind.as_str(),
            Self::Exhausted { .. } => "candidates-exhausted",
            Self::Cancelled => "cancelled",
            Self::Connect(_) => "session-construction-failed",
            Self::Release(_) => "session-release-failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rejected_key_is_retryable() {
        let rejected = CredentialError::auth(
            AuthErrorKind::CredentialNotAccepted,
            "API_KEY_INVALID",
            "API key not valid. Please pass a valid API key.",
        );
        assert!(rejected.is_retryable());

        for kind in [
            AuthErrorKind::InvalidIdentifierOrSecret,
            AuthErrorKind::TokenExpired,
            AuthErrorKind::ServiceUnavailable,
        ] {
            assert!(!CredentialError::auth(kind, "X", "x").is_retryable());
        }
        assert!(!CredentialError::config("missing").is_retryable());
    }

    #[test]
    fn test_auth_display_is_provider_message() {
        let err = CredentialError::auth(
            AuthErrorKind::InvalidIdentifierOrSecret,
            "INVALID_PASSWORD",
            "INVALID_PASSWORD",
        );
        assert_eq!(err.to_string(), "INVALID_PASSWORD");
        assert_eq!(err.code(), "invalid-identifier-or-secret");
    }

    #[test]
    fn test_kind_display_matches_serialized_name() {
        for kind in [
            AuthErrorKind::CredentialNotAccepted,
            AuthErrorKind::InvalidIdentifierOrSecret,
            AuthErrorKind::TokenExpired,
            AuthErrorKind::ServiceUnavailable,
        ] {
            let serialized = serde_json::to_value(kind).unwrap();
            assert_eq!(serialized, kind.to_string());
            assert_eq!(kind.as_str(), kind.to_string());
        }
        assert_eq!(AuthErrorKind::TokenExpired.to_string(), "token-expired");
    }

    #[test]
    fn test_from_code_covers_rest_and_sdk_spellings() {
        assert_eq!(
            AuthErrorKind::from_code(SDK_API_KEY_NOT_VALID),
            AuthErrorKind::CredentialNotAccepted
        );
        assert_eq!(
            AuthErrorKind::from_code("API_KEY_INVALID"),
            AuthErrorKind::CredentialNotAccepted
        );
        assert_eq!(
            AuthErrorKind::from_code("auth/wrong-password"),
            AuthErrorKind::InvalidIdentifierOrSecret
        );
        assert_eq!(
            AuthErrorKind::from_code("TOKEN_EXPIRED"),
            AuthErrorKind::TokenExpired
        );
        assert_eq!(
            AuthErrorKind::from_code("TOO_MANY_ATTEMPTS_TRY_LATER"),
            AuthErrorKind::ServiceUnavailable
        );
    }

    #[test]
    fn test_exhausted_message_is_distinct() {
        let err = CredentialError::Exhausted {
            retries: 1,
            last_error: "API key not valid.".to_string(),
        };
        assert!(err.to_string().starts_with("All authentication attempts failed"));
        assert_eq!(err.code(), "candidates-exhausted");
    }
}
