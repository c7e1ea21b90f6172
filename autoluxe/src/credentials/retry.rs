//! Retry coordinator.
//!
//! Drives one login attempt through the candidate keys:
//!
//! ```text
//! Attempting --success--------------------------> Resolved(Ok)
//! Attempting --non-retryable error--------------> Resolved(Err)
//! Attempting --key rejected, next key exists----> Retrying --delay--> Attempting
//! Attempting --key rejected, none left----------> Resolved(Exhausted)
//! ```
//!
//! The retry counter lives in a caller-owned [`RetrySession`]; nothing resets
//! it implicitly. Callers that want a fresh budget call
//! [`RetryCoordinator::reset`] before signing in.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::backend::SessionCredential;
use super::diagnostics::DiagnosticChannel;
use super::error::CredentialError;
use super::session::{DEFAULT_RELEASE_TIMEOUT, SessionInitializer};
use crate::config::env::{self, Lookup};

/// Pause between a rejected key and the attempt with the next one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// Bound on releasing a previous session handle.
    pub release_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Supported env vars: `AUTOLUXE_AUTH_RETRY_DELAY_MS` (default 500),
    /// `AUTOLUXE_SESSION_RELEASE_TIMEOUT_MS` (default 2000).
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        let defaults = Self::default();
        Self {
            delay: Duration::from_millis(env::parsed(
                lookup,
                "AUTOLUXE_AUTH_RETRY_DELAY_MS",
                defaults.delay.as_millis() as u64,
            )),
            release_timeout: Duration::from_millis(env::parsed(
                lookup,
                "AUTOLUXE_SESSION_RELEASE_TIMEOUT_MS",
                defaults.release_timeout.as_millis() as u64,
            )),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Retry state of one login flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrySession {
    retry_count: u32,
    last_error: Option<String>,
}

impl RetrySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of key switches made so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Message of the last retryable error.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn record_failure(&mut self, message: String) -> u32 {
        self.retry_count += 1;
        self.last_error = Some(message);
        self.retry_count
    }

    fn clear(&mut self) {
        self.retry_count = 0;
        self.last_error = None;
    }
}

pub struct RetryCoordinator {
    policy: RetryPolicy,
    diagnostics: DiagnosticChannel,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            diagnostics: DiagnosticChannel::disabled(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticChannel) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Zero the counter and drop the recorded error, here and in diagnostics.
    pub fn reset(&self, session: &mut RetrySession) {
        session.clear();
        self.diagnostics.clear_retry_state();
    }

    /// Sign in, switching keys while the service rejects the key in use.
    ///
    /// The retry budget is the length of the candidate list. Only
    /// [`CredentialError::is_retryable`] errors cause a switch; anything else
    /// is returned unchanged. When no key is left the result is
    /// [`CredentialError::Exhausted`] carrying the last rejection message.
    #[instrument(skip_all, fields(identifier = %identifier, retries = session.retry_count()))]
    pub async fn sign_in(
        &self,
        initializer: &mut SessionInitializer,
        session: &mut RetrySession,
        identifier: &str,
        secret: &str,
        cancel: &CancellationToken,
    ) -> Result<SessionCredential, CredentialError> {
        let budget = initializer.candidates().len() as u32;
        let mut handle = initializer.activate().await?;

        loop {
            if cancel.is_cancelled() {
                return Err(CredentialError::Cancelled);
            }

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CredentialError::Cancelled),
                result = handle.sign_in(identifier, secret) => result,
            };

            let rejection = match attempt {
                Ok(credential) => {
                    info!(
                        candidate = handle.options().candidate_index,
                        retries = session.retry_count(),
                        "Sign-in succeeded"
                    );
                    return Ok(credential);
                }
                Err(e) if e.is_retryable() => e,
                Err(e) => {
                    debug!(error = %e, code = e.code(), "Sign-in failed with non-retryable error");
                    return Err(e);
                }
            };

            let message = rejection.to_string();
            warn!(
                candidate = handle.options().candidate_index,
                error = %message,
                "API key rejected"
            );

            if session.retry_count() >= budget || !initializer.has_next() {
                error!(
                    retries = session.retry_count(),
                    budget, "All authentication attempts failed"
                );
                return Err(CredentialError::Exhausted {
                    retries: session.retry_count(),
                    last_error: message,
                });
            }

            let retry_count = session.record_failure(message.clone());
            self.diagnostics.record_retry(retry_count, &message);
            info!("Auth retry attempt {} of {}", retry_count, budget);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CredentialError::Cancelled),
                _ = tokio::time::sleep(self.policy.delay) => {}
            }

            handle = match initializer.advance().await {
                Some(next) => next,
                None => {
                    error!(retries = retry_count, "No usable API key left after rejection");
                    return Err(CredentialError::Exhausted {
                        retries: retry_count,
                        last_error: message,
                    });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::map_lookup;

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::from_lookup(&map_lookup(&[]));
        assert_eq!(policy.delay, Duration::from_millis(500));
        assert_eq!(policy.release_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_policy_overrides() {
        let policy = RetryPolicy::from_lookup(&map_lookup(&[
            ("AUTOLUXE_AUTH_RETRY_DELAY_MS", "25"),
            ("AUTOLUXE_SESSION_RELEASE_TIMEOUT_MS", "100"),
        ]));
        assert_eq!(policy.delay, Duration::from_millis(25));
        assert_eq!(policy.release_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_session_counter_and_clear() {
        let mut session = RetrySession::new();
        assert_eq!(session.record_failure("first".into()), 1);
        assert_eq!(session.record_failure("second".into()), 2);
        assert_eq!(session.last_error(), Some("second"));

        session.clear();
        assert_eq!(session, RetrySession::default());
    }

    #[test]
    fn test_reset_clears_diagnostics() {
        let diagnostics = DiagnosticChannel::in_memory();
        let coordinator =
            RetryCoordinator::new(RetryPolicy::default()).with_diagnostics(diagnostics.clone());
        let mut session = RetrySession::new();
        session.record_failure("API key not valid.".into());
        diagnostics.record_retry(1, "API key not valid.");

        coordinator.reset(&mut session);
        assert_eq!(session.retry_count(), 0);
        assert_eq!(
            diagnostics
                .reader()
                .read(crate::credentials::diagnostics::DiagnosticKey::RetryCount),
            None
        );
    }
}
