//! Session initializer.
//!
//! Owns the single active backend handle and walks the candidate list
//! strictly forward: primary first, then each present alternate once.
//! Switching keys releases the previous handle before the next one is
//! constructed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::backend::{BackendConnector, BackendProfile, BackendSession, SessionOptions};
use super::candidates::{CredentialCandidates, MaskedSecret};
use super::diagnostics::DiagnosticChannel;
use super::error::CredentialError;

/// Upper bound on how long releasing a handle may take.
pub const DEFAULT_RELEASE_TIMEOUT: Duration = Duration::from_secs(2);

/// What the initializer knows about the active handle.
#[derive(Debug, Clone, Serialize)]
pub struct HandleRecord {
    pub candidate_index: usize,
    pub key: MaskedSecret,
    pub activated_at: DateTime<Utc>,
    /// Problems met while getting here: failed releases and rejected candidates.
    pub warnings: Vec<String>,
}

struct ActiveSession {
    handle: Arc<dyn BackendSession>,
    record: HandleRecord,
}

pub struct SessionInitializer {
    candidates: CredentialCandidates,
    profile: BackendProfile,
    connector: Arc<dyn BackendConnector>,
    diagnostics: DiagnosticChannel,
    release_timeout: Duration,
    active: Option<ActiveSession>,
    /// Last candidate index tried, whether or not it became active.
    position: Option<usize>,
}

impl SessionInitializer {
    pub fn new(
        candidates: CredentialCandidates,
        profile: BackendProfile,
        connector: Arc<dyn BackendConnector>,
    ) -> Self {
        Self {
            candidates,
            profile,
            connector,
            diagnostics: DiagnosticChannel::disabled(),
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
            active: None,
            position: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticChannel) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = timeout;
        self
    }

    pub fn candidates(&self) -> &CredentialCandidates {
        &self.candidates
    }

    pub fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.record.candidate_index)
    }

    pub fn active_record(&self) -> Option<&HandleRecord> {
        self.active.as_ref().map(|active| &active.record)
    }

    pub fn handle(&self) -> Option<Arc<dyn BackendSession>> {
        self.active.as_ref().map(|active| Arc::clone(&active.handle))
    }

    /// Return the active handle, creating one if needed.
    ///
    /// The first activation starts at the primary key. A missing primary key,
    /// or a list where no candidate yields a usable handle, is a configuration
    /// error.
    pub async fn activate(&mut self) -> Result<Arc<dyn BackendSession>, CredentialError> {
        if let Some(active) = &self.active {
            return Ok(Arc::clone(&active.handle));
        }

        if !self.candidates.has_primary() {
            return Err(CredentialError::config("primary API key is not configured"));
        }

        if self.position.is_some() {
            return Err(CredentialError::config(
                "no usable API key remains; every configured candidate has been tried",
            ));
        }

        match self.select_from(0).await {
            Some(handle) => Ok(handle),
            None => Err(CredentialError::config(format!(
                "none of the {} configured API keys produced a usable session",
                self.candidates.present_count()
            ))),
        }
    }

    /// Whether a present candidate exists past the current position.
    pub fn has_next(&self) -> bool {
        self.candidates.next_present(self.next_start()).is_some()
    }

    /// Move to the next usable candidate.
    ///
    /// The current handle is released before the next candidate is built.
    /// Returns `None` when no usable candidate follows. If no candidate lies
    /// past the current position the current handle stays active; if every
    /// later candidate fails to construct or validate, no handle is active
    /// afterwards and [`activate`](Self::activate) reports a configuration
    /// error.
    pub async fn advance(&mut self) -> Option<Arc<dyn BackendSession>> {
        if !self.has_next() {
            debug!(
                position = ?self.position,
                "No further API key candidates to advance to"
            );
            return None;
        }
        let start = self.next_start();
        self.select_from(start).await
    }

    fn next_start(&self) -> usize {
        self.position.map_or(0, |index| index + 1)
    }

    async fn select_from(&mut self, start: usize) -> Option<Arc<dyn BackendSession>> {
        let mut warnings = Vec::new();
        let mut cursor = start;

        while let Some(index) = self.candidates.next_present(cursor) {
            if index > cursor {
                debug!(from = cursor, to = index, "Skipping blank API key candidates");
            }
            self.position = Some(index);
            cursor = index + 1;

            let Some(api_key) = self.candidates.get(index).cloned() else {
                continue;
            };

            if let Some(previous) = self.active.take()
                && let Some(warning) = self
                    .release(previous.handle, previous.record.candidate_index)
                    .await
            {
                warnings.push(warning);
            }

            let options = SessionOptions {
                candidate_index: index,
                api_key,
                profile: self.profile.clone(),
            };
            let key = options.masked_key();

            let handle = match self.connector.connect(options).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(candidate = index, key = %key, error = %e, "Failed to construct session");
                    warnings.push(format!("candidate {index} ({key}) not constructed: {e}"));
                    continue;
                }
            };

            if let Err(e) = handle.validate().await {
                warn!(candidate = index, key = %key, error = %e, "Session failed validation");
                warnings.push(format!("candidate {index} ({key}) failed validation: {e}"));
                if let Some(warning) = self.release(handle, index).await {
                    warnings.push(warning);
                }
                continue;
            }

            info!(candidate = index, key = %key, "Backend session activated");
            self.diagnostics.record_secret_suffix(&key);
            self.active = Some(ActiveSession {
                handle: Arc::clone(&handle),
                record: HandleRecord {
                    candidate_index: index,
                    key,
                    activated_at: Utc::now(),
                    warnings,
                },
            });
            return Some(handle);
        }

        None
    }

    /// Release a handle within the timeout. Returns a warning on failure.
    async fn release(&self, handle: Arc<dyn BackendSession>, index: usize) -> Option<String> {
        match tokio::time::timeout(self.release_timeout, handle.release()).await {
            Ok(Ok(())) => {
                debug!(candidate = index, "Released backend session");
                None
            }
            Ok(Err(e)) => {
                warn!(candidate = index, error = %e, "Failed to release backend session");
                Some(format!("release of candidate {index} failed: {e}"))
            }
            Err(_) => {
                warn!(
                    candidate = index,
                    timeout_ms = self.release_timeout.as_millis() as u64,
                    "Timed out releasing backend session"
                );
                Some(format!(
                    "release of candidate {index} timed out after {}ms",
                    self.release_timeout.as_millis()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::credentials::backend::{SessionCredential, VerifiedUser};
    use crate::credentials::diagnostics::DiagnosticKey;

    struct StubSession {
        options: SessionOptions,
        hang_on_release: bool,
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BackendSession for StubSession {
        fn options(&self) -> &SessionOptions {
            &self.options
        }

        async fn validate(&self) -> Result<(), CredentialError> {
            if self.options.api_key.expose_secret().starts_with("INVALID") {
                return Err(CredentialError::Connect("malformed key".into()));
            }
            Ok(())
        }

        async fn sign_in(&self, _: &str, _: &str) -> Result<SessionCredential, CredentialError> {
            unreachable!("not used by initializer tests")
        }

        async fn verify_id_token(&self, _: &str) -> Result<VerifiedUser, CredentialError> {
            unreachable!("not used by initializer tests")
        }

        async fn release(&self) -> Result<(), CredentialError> {
            if self.hang_on_release {
                std::future::pending::<()>().await;
            }
            self.released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubConnector {
        hang_on_release: bool,
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BackendConnector for StubConnector {
        async fn connect(
            &self,
            options: SessionOptions,
        ) -> Result<Arc<dyn BackendSession>, CredentialError> {
            if options.api_key.expose_secret().starts_with("UNREACHABLE") {
                return Err(CredentialError::Connect("cannot construct".into()));
            }
            Ok(Arc::new(StubSession {
                options,
                hang_on_release: self.hang_on_release,
                released: Arc::clone(&self.released),
            }))
        }
    }

    fn initializer(keys: Vec<Option<&str>>, connector: StubConnector) -> SessionInitializer {
        SessionInitializer::new(
            CredentialCandidates::new(keys),
            BackendProfile::default(),
            Arc::new(connector),
        )
    }

    #[tokio::test]
    async fn test_activate_starts_at_primary() {
        let mut init = initializer(
            vec![Some("PRIMARY-KEY-0001"), Some("ALT-KEY-0002")],
            StubConnector::default(),
        );
        let handle = init.activate().await.unwrap();
        assert_eq!(handle.options().candidate_index, 0);
        assert_eq!(init.active_index(), Some(0));

        // A second activation reuses the handle.
        let again = init.activate().await.unwrap();
        assert!(Arc::ptr_eq(&handle, &again));
    }

    #[tokio::test]
    async fn test_missing_primary_is_configuration_error() {
        let mut init = initializer(vec![None, Some("ALT-KEY-0002")], StubConnector::default());
        let err = init.activate().await.err().unwrap();
        assert!(matches!(err, CredentialError::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_advance_skips_blanks_and_releases_previous() {
        let connector = StubConnector::default();
        let released = Arc::clone(&connector.released);
        let mut init = initializer(
            vec![Some("PRIMARY-KEY-0001"), None, Some("ALT-KEY-0003")],
            connector,
        );

        init.activate().await.unwrap();
        let next = init.advance().await.unwrap();
        assert_eq!(next.options().candidate_index, 2);
        assert_eq!(released.load(Ordering::SeqCst), 1);

        assert!(!init.has_next());
        assert!(init.advance().await.is_none());
        // The last handle stays active when the list runs out.
        assert_eq!(init.active_index(), Some(2));
    }

    #[tokio::test]
    async fn test_unusable_candidates_skipped_with_warnings() {
        let mut init = initializer(
            vec![
                Some("PRIMARY-KEY-0001"),
                Some("UNREACHABLE-0002"),
                Some("INVALID-KEY-0003"),
                Some("ALT-KEY-0004"),
            ],
            StubConnector::default(),
        );
        init.activate().await.unwrap();
        let handle = init.advance().await.unwrap();
        assert_eq!(handle.options().candidate_index, 3);

        let record = init.active_record().unwrap();
        assert_eq!(record.key.suffix(), "0004");
        assert_eq!(record.warnings.len(), 2);
        assert!(record.warnings[0].contains("not constructed"));
        assert!(record.warnings[1].contains("failed validation"));
    }

    #[tokio::test]
    async fn test_advance_past_unusable_tail_leaves_no_active_handle() {
        let connector = StubConnector::default();
        let released = Arc::clone(&connector.released);
        let mut init = initializer(
            vec![
                Some("PRIMARY-KEY-0001"),
                Some("UNREACHABLE-0002"),
                Some("INVALID-KEY-0003"),
            ],
            connector,
        );

        init.activate().await.unwrap();
        assert!(init.has_next());
        assert!(init.advance().await.is_none());

        // The primary and the invalid candidate were both released.
        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert_eq!(init.active_index(), None);
        assert!(!init.has_next());

        let err = init.activate().await.err().unwrap();
        assert!(matches!(err, CredentialError::Configuration(_)));
        assert!(err.to_string().contains("no usable API key remains"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_release_is_bounded() {
        let connector = StubConnector {
            hang_on_release: true,
            ..Default::default()
        };
        let mut init =
            initializer(vec![Some("PRIMARY-KEY-0001"), Some("ALT-KEY-0002")], connector)
                .with_release_timeout(Duration::from_millis(50));

        init.activate().await.unwrap();
        let handle = init.advance().await.unwrap();
        assert_eq!(handle.options().candidate_index, 1);

        let record = init.active_record().unwrap();
        assert_eq!(record.warnings.len(), 1);
        assert!(record.warnings[0].contains("timed out"));
    }

    #[tokio::test]
    async fn test_activation_records_masked_suffix() {
        let diagnostics = DiagnosticChannel::in_memory();
        let mut init = initializer(vec![Some("PRIMARY-KEY-7777")], StubConnector::default())
            .with_diagnostics(diagnostics.clone());
        init.activate().await.unwrap();

        assert_eq!(
            diagnostics
                .reader()
                .read(DiagnosticKey::LastUsedSecretSuffix)
                .as_deref(),
            Some("***********7777")
        );
    }
}
