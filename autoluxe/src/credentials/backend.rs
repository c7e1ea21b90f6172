//! Backend session traits.
//!
//! A [`BackendConnector`] turns a candidate key into a live
//! [`BackendSession`]. The session initializer only talks to these traits,
//! so the hosted identity client and test doubles are interchangeable.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;

use super::candidates::MaskedSecret;
use super::error::CredentialError;
use crate::config::BackendConfig;

/// Non-secret project settings shared by every session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackendProfile {
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub measurement_id: Option<String>,
}

impl BackendProfile {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            auth_domain: config.auth_domain.clone(),
            project_id: config.project_id.clone(),
            storage_bucket: config.storage_bucket.clone(),
            messaging_sender_id: config.messaging_sender_id.clone(),
            app_id: config.app_id.clone(),
            measurement_id: config.measurement_id.clone(),
        }
    }
}

/// Everything needed to construct one session handle.
#[derive(Clone)]
pub struct SessionOptions {
    /// Position of the key in the candidate list.
    pub candidate_index: usize,
    pub api_key: Arc<SecretString>,
    pub profile: BackendProfile,
}

impl SessionOptions {
    pub fn masked_key(&self) -> MaskedSecret {
        MaskedSecret::from_secret(&self.api_key)
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("candidate_index", &self.candidate_index)
            .field("api_key", &self.masked_key())
            .field("profile", &self.profile)
            .finish()
    }
}

/// Result of a successful sign-in.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredential {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Identity behind a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedUser {
    pub uid: String,
    pub email: Option<String>,
}

/// A live session bound to one candidate key.
#[async_trait]
pub trait BackendSession: Send + Sync {
    fn options(&self) -> &SessionOptions;

    /// Cheap local check that the handle is usable before it is activated.
    async fn validate(&self) -> Result<(), CredentialError> {
        Ok(())
    }

    /// Password sign-in.
    async fn sign_in(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<SessionCredential, CredentialError>;

    /// Resolve an ID token to the user it was issued for.
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedUser, CredentialError>;

    /// Release any resources held by the handle.
    async fn release(&self) -> Result<(), CredentialError> {
        Ok(())
    }
}

/// Factory for session handles.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(
        &self,
        options: SessionOptions,
    ) -> Result<Arc<dyn BackendSession>, CredentialError>;
}
