//! Admin authentication service.
//!
//! Wires the session initializer, the retry coordinator and the diagnostic
//! channel together for the admin login and token verification flows.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::backend::{BackendConnector, BackendProfile, SessionCredential, VerifiedUser};
use super::candidates::CredentialCandidates;
use super::diagnostics::DiagnosticChannel;
use super::error::CredentialError;
use super::retry::{RetryCoordinator, RetryPolicy, RetrySession};
use super::session::SessionInitializer;
use super::snapshot::DiagnosticSnapshot;

#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("Only @{0} email addresses are allowed")]
    EmailDomainNotAllowed(String),

    #[error("Missing authentication token")]
    MissingToken,

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Successful admin login.
#[derive(Debug, Clone)]
pub struct AdminLogin {
    pub credential: SessionCredential,
    /// Key switches needed before the sign-in went through.
    pub retries: u32,
}

/// Failed admin login, with a snapshot when diagnostics are enabled.
#[derive(Debug)]
pub struct LoginFailure {
    pub error: AdminAuthError,
    pub snapshot: Option<DiagnosticSnapshot>,
}

pub struct AdminAuthService {
    initializer: Mutex<SessionInitializer>,
    coordinator: RetryCoordinator,
    diagnostics: DiagnosticChannel,
    admin_email_domain: String,
    config_presence: Vec<(&'static str, bool)>,
}

impl AdminAuthService {
    pub fn new(
        candidates: CredentialCandidates,
        profile: BackendProfile,
        connector: Arc<dyn BackendConnector>,
        policy: RetryPolicy,
        diagnostics: DiagnosticChannel,
        admin_email_domain: impl Into<String>,
    ) -> Self {
        let initializer = SessionInitializer::new(candidates, profile, connector)
            .with_release_timeout(policy.release_timeout)
            .with_diagnostics(diagnostics.clone());
        let coordinator = RetryCoordinator::new(policy).with_diagnostics(diagnostics.clone());

        Self {
            initializer: Mutex::new(initializer),
            coordinator,
            diagnostics,
            admin_email_domain: admin_email_domain.into().to_ascii_lowercase(),
            config_presence: Vec::new(),
        }
    }

    /// Names and presence flags of the settings shown in snapshots.
    pub fn with_config_presence(mut self, presence: Vec<(&'static str, bool)>) -> Self {
        self.config_presence = presence;
        self
    }

    pub fn admin_email_domain(&self) -> &str {
        &self.admin_email_domain
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics.is_enabled()
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        email
            .trim()
            .to_ascii_lowercase()
            .ends_with(&format!("@{}", self.admin_email_domain))
    }

    /// Sign an admin in. Every call starts with a fresh retry budget.
    #[instrument(skip(self, password, cancel), fields(email = %email))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<AdminLogin, LoginFailure> {
        if !self.is_admin_email(email) {
            warn!("Rejected login outside the admin email domain");
            return Err(LoginFailure {
                error: AdminAuthError::EmailDomainNotAllowed(self.admin_email_domain.clone()),
                snapshot: None,
            });
        }

        let mut initializer = self.initializer.lock().await;
        // Retry state is shared; only the sequence holding the lock may clear it.
        let mut session = RetrySession::new();
        self.coordinator.reset(&mut session);
        match self
            .coordinator
            .sign_in(&mut initializer, &mut session, email, password, cancel)
            .await
        {
            Ok(credential) => {
                info!(retries = session.retry_count(), "Admin signed in");
                Ok(AdminLogin {
                    credential,
                    retries: session.retry_count(),
                })
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "Admin sign-in failed");
                let snapshot = self.diagnostics.is_enabled().then(|| {
                    DiagnosticSnapshot::capture(
                        &self.config_presence,
                        &initializer,
                        &self.diagnostics.reader(),
                        Some(&session),
                    )
                });
                Err(LoginFailure {
                    error: e.into(),
                    snapshot,
                })
            }
        }
    }

    /// Verify an ID token and require the admin email domain.
    #[instrument(skip_all)]
    pub async fn verify_admin(&self, id_token: &str) -> Result<VerifiedUser, AdminAuthError> {
        let id_token = id_token.trim();
        if id_token.is_empty() {
            return Err(AdminAuthError::MissingToken);
        }

        let handle = {
            let mut initializer = self.initializer.lock().await;
            initializer.activate().await?
        };
        let user = handle.verify_id_token(id_token).await?;

        match user.email.as_deref() {
            Some(email) if self.is_admin_email(email) => Ok(user),
            other => {
                warn!(email = ?other, "Unauthorized admin access attempt");
                Err(AdminAuthError::EmailDomainNotAllowed(
                    self.admin_email_domain.clone(),
                ))
            }
        }
    }

    /// Current diagnostic snapshot, regardless of any login in progress.
    pub async fn snapshot(&self) -> DiagnosticSnapshot {
        let initializer = self.initializer.lock().await;
        DiagnosticSnapshot::capture(
            &self.config_presence,
            &initializer,
            &self.diagnostics.reader(),
            None,
        )
    }
}
