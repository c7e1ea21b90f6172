//! Hosted identity service client.
//!
//! Talks to the identity REST API:
//! - password sign-in: `POST {endpoint}/v1/accounts:signInWithPassword?key=...`
//! - ID token lookup: `POST {endpoint}/v1/accounts:lookup?key=...`
//!
//! Errors are classified from the structured error envelope (`reason` and
//! the leading code of `message`), never from free text.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::credentials::backend::{
    BackendConnector, BackendSession, SessionCredential, SessionOptions, VerifiedUser,
};
use crate::credentials::error::{AuthErrorKind, CredentialError};

const SIGN_IN_PATH: &str = "/v1/accounts:signInWithPassword";
const LOOKUP_PATH: &str = "/v1/accounts:lookup";

/// Keys at or below this length are refused before any request is made.
const MIN_API_KEY_LEN: usize = 10;

/// Creates [`IdentitySession`]s against one endpoint.
pub struct IdentityConnector {
    client: Client,
    endpoint: String,
}

impl IdentityConnector {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BackendConnector for IdentityConnector {
    async fn connect(
        &self,
        options: SessionOptions,
    ) -> Result<Arc<dyn BackendSession>, CredentialError> {
        Ok(Arc::new(IdentitySession {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            options,
        }))
    }
}

/// A session bound to one API key. Stateless on the wire.
pub struct IdentitySession {
    client: Client,
    endpoint: String,
    options: SessionOptions,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorReason>,
    #[serde(default)]
    details: Vec<ErrorReason>,
}

#[derive(Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: Option<String>,
}

impl IdentitySession {
    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, CredentialError> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.options.api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(classify_error(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            CredentialError::auth(
                AuthErrorKind::ServiceUnavailable,
                "MALFORMED_RESPONSE",
                format!("Unreadable identity service response: {e}"),
            )
        })
    }
}

#[async_trait]
impl BackendSession for IdentitySession {
    fn options(&self) -> &SessionOptions {
        &self.options
    }

    async fn validate(&self) -> Result<(), CredentialError> {
        let key = self.options.api_key.expose_secret();
        if key.len() <= MIN_API_KEY_LEN || key.chars().any(char::is_whitespace) {
            return Err(CredentialError::Connect(format!(
                "API key {} is malformed",
                self.options.masked_key()
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, secret), fields(candidate = self.options.candidate_index))]
    async fn sign_in(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<SessionCredential, CredentialError> {
        let response: SignInResponse = self
            .post(
                SIGN_IN_PATH,
                json!({
                    "email": identifier,
                    "password": secret,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        Ok(SessionCredential {
            uid: response.local_id,
            email: response.email,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_in: response
                .expires_in
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        })
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedUser, CredentialError> {
        let response: LookupResponse = self
            .post(LOOKUP_PATH, json!({ "idToken": id_token }))
            .await?;

        let user = response.users.into_iter().next().ok_or_else(|| {
            CredentialError::auth(AuthErrorKind::TokenExpired, "USER_NOT_FOUND", "USER_NOT_FOUND")
        })?;

        Ok(VerifiedUser {
            uid: user.local_id,
            email: user.email,
        })
    }

    async fn release(&self) -> Result<(), CredentialError> {
        debug!(
            candidate = self.options.candidate_index,
            key = %self.options.masked_key(),
            "Identity session released"
        );
        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> CredentialError {
    CredentialError::auth(
        AuthErrorKind::ServiceUnavailable,
        "NETWORK_ERROR",
        format!("Identity service unreachable: {e}"),
    )
}

/// Map an error response to a classified [`CredentialError`].
pub(crate) fn classify_error(status: StatusCode, body: &[u8]) -> CredentialError {
    let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) else {
        return CredentialError::auth(
            AuthErrorKind::ServiceUnavailable,
            status.as_str(),
            format!("Identity service returned HTTP {status}"),
        );
    };
    let error = envelope.error;

    let key_rejected = error
        .errors
        .iter()
        .chain(error.details.iter())
        .filter_map(|reason| reason.reason.as_deref())
        .find(|reason| AuthErrorKind::from_code(reason) == AuthErrorKind::CredentialNotAccepted);
    if let Some(reason) = key_rejected {
        return CredentialError::auth(AuthErrorKind::CredentialNotAccepted, reason, error.message);
    }

    // Message codes look like "INVALID_PASSWORD" or "TOO_MANY_ATTEMPTS_TRY_LATER : ...".
    let code = error
        .message
        .split(" : ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    let kind = if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        AuthErrorKind::ServiceUnavailable
    } else {
        AuthErrorKind::from_code(&code)
    };
    CredentialError::auth(kind, code, error.message)
}
