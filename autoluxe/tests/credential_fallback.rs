//! API-key fallback behaviour against scripted backends.
//!
//! Keys starting with `GOOD` accept sign-ins, keys starting with `BAD` are
//! rejected as invalid API keys. Behind a working key, the password
//! `wrong-password` is refused as a bad secret, `expired-session` as an
//! expired token, and `service-down` as an unavailable service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use autoluxe::credentials::{
    AdminAuthService, AuthErrorKind, BackendConnector, BackendProfile, BackendSession,
    CredentialCandidates, CredentialError, DiagnosticChannel, DiagnosticKey, RetryCoordinator,
    RetryPolicy, RetrySession, SDK_API_KEY_NOT_VALID, SessionCredential, SessionInitializer,
    SessionOptions, VerifiedUser,
};

#[derive(Default)]
struct Script {
    /// Keys used for sign-in attempts, in order.
    attempts: Mutex<Vec<String>>,
    /// Keys handles were constructed for, in order.
    connects: Mutex<Vec<String>>,
    released: Mutex<Vec<String>>,
}

struct ScriptedConnector {
    script: Arc<Script>,
}

struct ScriptedSession {
    options: SessionOptions,
    script: Arc<Script>,
}

#[async_trait]
impl BackendConnector for ScriptedConnector {
    async fn connect(
        &self,
        options: SessionOptions,
    ) -> Result<Arc<dyn BackendSession>, CredentialError> {
        self.script
            .connects
            .lock()
            .push(options.api_key.expose_secret().to_string());
        Ok(Arc::new(ScriptedSession {
            options,
            script: self.script.clone(),
        }))
    }
}

#[async_trait]
impl BackendSession for ScriptedSession {
    fn options(&self) -> &SessionOptions {
        &self.options
    }

    async fn sign_in(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<SessionCredential, CredentialError> {
        let key = self.options.api_key.expose_secret().to_string();
        self.script.attempts.lock().push(key.clone());

        if key.starts_with("BAD") {
            return Err(CredentialError::auth(
                AuthErrorKind::CredentialNotAccepted,
                SDK_API_KEY_NOT_VALID,
                "API key not valid. Please pass a valid API key.",
            ));
        }
        match secret {
            "wrong-password" => {
                return Err(CredentialError::auth(
                    AuthErrorKind::InvalidIdentifierOrSecret,
                    "INVALID_PASSWORD",
                    "INVALID_PASSWORD",
                ));
            }
            "expired-session" => {
                return Err(CredentialError::auth(
                    AuthErrorKind::TokenExpired,
                    "TOKEN_EXPIRED",
                    "TOKEN_EXPIRED",
                ));
            }
            "service-down" => {
                return Err(CredentialError::auth(
                    AuthErrorKind::ServiceUnavailable,
                    "UNAVAILABLE",
                    "The service is currently unavailable.",
                ));
            }
            _ => {}
        }

        Ok(SessionCredential {
            uid: format!("uid-{}", self.options.candidate_index),
            email: Some(identifier.to_string()),
            id_token: "id-token".to_string(),
            refresh_token: "refresh-token".to_string(),
            expires_in: 3600,
        })
    }

    async fn verify_id_token(&self, _id_token: &str) -> Result<VerifiedUser, CredentialError> {
        Ok(VerifiedUser {
            uid: "uid".to_string(),
            email: Some("ops@autoluxe.com".to_string()),
        })
    }

    async fn release(&self) -> Result<(), CredentialError> {
        self.script
            .released
            .lock()
            .push(self.options.api_key.expose_secret().to_string());
        Ok(())
    }
}

fn setup(keys: &[Option<&str>]) -> (SessionInitializer, Arc<Script>) {
    let script = Arc::new(Script::default());
    let initializer = SessionInitializer::new(
        CredentialCandidates::new(keys.iter().copied()),
        BackendProfile::default(),
        Arc::new(ScriptedConnector {
            script: script.clone(),
        }),
    );
    (initializer, script)
}

fn coordinator() -> RetryCoordinator {
    RetryCoordinator::new(RetryPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn good_primary_signs_in_without_retries() {
    let (mut initializer, script) = setup(&[Some("GOOD-PRIMARY"), Some("GOOD-ALT-1")]);
    let mut session = RetrySession::new();

    let credential = coordinator()
        .sign_in(
            &mut initializer,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(credential.uid, "uid-0");
    assert_eq!(session.retry_count(), 0);
    assert_eq!(*script.attempts.lock(), vec!["GOOD-PRIMARY"]);
}

#[tokio::test(start_paused = true)]
async fn rejected_keys_are_skipped_until_one_works() {
    let (mut initializer, script) = setup(&[
        Some("BAD-PRIMARY"),
        Some("BAD-ALT-1"),
        Some("GOOD-ALT-2"),
        Some("GOOD-ALT-3"),
    ]);
    let mut session = RetrySession::new();

    let credential = coordinator()
        .sign_in(
            &mut initializer,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(credential.uid, "uid-2");
    assert_eq!(session.retry_count(), 2);
    assert_eq!(initializer.active_index(), Some(2));
    assert_eq!(
        *script.attempts.lock(),
        vec!["BAD-PRIMARY", "BAD-ALT-1", "GOOD-ALT-2"]
    );
    // Each replaced handle is released exactly once.
    assert_eq!(*script.released.lock(), vec!["BAD-PRIMARY", "BAD-ALT-1"]);
}

#[tokio::test(start_paused = true)]
async fn all_rejected_keys_exhaust_after_one_attempt_each() {
    let (mut initializer, script) =
        setup(&[Some("BAD-PRIMARY"), Some("BAD-ALT-1"), Some("BAD-ALT-2")]);
    let mut session = RetrySession::new();

    let err = coordinator()
        .sign_in(
            &mut initializer,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match &err {
        CredentialError::Exhausted {
            retries,
            last_error,
        } => {
            assert_eq!(*retries, 2);
            assert!(last_error.contains("API key not valid"));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "All authentication attempts failed after 2 retries. Please check the API key configuration."
    );
    assert_eq!(script.attempts.lock().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn wrong_password_is_not_retried() {
    let (mut initializer, script) = setup(&[Some("GOOD-PRIMARY"), Some("GOOD-ALT-1")]);
    let mut session = RetrySession::new();

    let err = coordinator()
        .sign_in(
            &mut initializer,
            &mut session,
            "ops@autoluxe.com",
            "wrong-password",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(AuthErrorKind::InvalidIdentifierOrSecret));
    assert_eq!(err.to_string(), "INVALID_PASSWORD");
    assert_eq!(session.retry_count(), 0);
    assert_eq!(script.attempts.lock().len(), 1);
    assert_eq!(initializer.active_index(), Some(0));
}

#[tokio::test(start_paused = true)]
async fn non_retryable_errors_after_a_switch_end_the_sequence() {
    let cases = [
        ("wrong-password", AuthErrorKind::InvalidIdentifierOrSecret, "INVALID_PASSWORD"),
        ("expired-session", AuthErrorKind::TokenExpired, "TOKEN_EXPIRED"),
        (
            "service-down",
            AuthErrorKind::ServiceUnavailable,
            "The service is currently unavailable.",
        ),
    ];

    for (secret, kind, message) in cases {
        let (mut initializer, script) =
            setup(&[Some("BAD-PRIMARY"), Some("GOOD-ALT-1"), Some("GOOD-ALT-2")]);
        let mut session = RetrySession::new();

        let err = coordinator()
            .sign_in(
                &mut initializer,
                &mut session,
                "ops@autoluxe.com",
                secret,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(kind), "{secret}");
        assert_eq!(err.to_string(), message);
        // Only the switch away from the rejected primary counts as a retry.
        assert_eq!(session.retry_count(), 1, "{secret}");
        assert_eq!(*script.attempts.lock(), vec!["BAD-PRIMARY", "GOOD-ALT-1"]);
        assert_eq!(initializer.active_index(), Some(1));
    }
}

#[tokio::test(start_paused = true)]
async fn non_retryable_errors_on_the_primary_keep_it_active() {
    for secret in ["expired-session", "service-down"] {
        let (mut initializer, script) = setup(&[Some("GOOD-PRIMARY"), Some("GOOD-ALT-1")]);
        let mut session = RetrySession::new();

        let err = coordinator()
            .sign_in(
                &mut initializer,
                &mut session,
                "ops@autoluxe.com",
                secret,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(!err.is_retryable(), "{secret}");
        assert_eq!(session.retry_count(), 0);
        assert_eq!(*script.attempts.lock(), vec!["GOOD-PRIMARY"]);
        assert!(script.released.lock().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn blank_alternates_are_never_used() {
    let (mut initializer, script) =
        setup(&[Some("BAD-PRIMARY"), None, Some("  "), Some("GOOD-ALT-3")]);
    let mut session = RetrySession::new();

    let credential = coordinator()
        .sign_in(
            &mut initializer,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(credential.uid, "uid-3");
    assert_eq!(session.retry_count(), 1);
    assert_eq!(*script.connects.lock(), vec!["BAD-PRIMARY", "GOOD-ALT-3"]);
}

#[tokio::test(start_paused = true)]
async fn missing_primary_is_a_configuration_error() {
    let (mut initializer, script) = setup(&[None, Some("GOOD-ALT-1")]);
    let mut session = RetrySession::new();

    let err = coordinator()
        .sign_in(
            &mut initializer,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CredentialError::Configuration(_)));
    assert!(script.connects.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_counter_exhausts_immediately_until_reset() {
    let coordinator = coordinator();
    let cancel = CancellationToken::new();
    let mut session = RetrySession::new();

    // Spend two retries on a three-key list.
    let (mut spent, _script) = setup(&[Some("BAD-A"), Some("BAD-B"), Some("BAD-C")]);
    let _ = coordinator
        .sign_in(
            &mut spent,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &cancel,
        )
        .await;
    assert_eq!(session.retry_count(), 2);

    // Without a reset the counter already meets the two-key budget, so the
    // first rejection ends the sequence even though a good key follows.
    let (mut fresh, script) = setup(&[Some("BAD-PRIMARY"), Some("GOOD-ALT-1")]);
    let err = coordinator
        .sign_in(
            &mut fresh,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::Exhausted { retries: 2, .. }));
    assert_eq!(*script.attempts.lock(), vec!["BAD-PRIMARY"]);

    // After a reset the same key list succeeds.
    coordinator.reset(&mut session);
    assert_eq!(session.retry_count(), 0);
    assert!(session.last_error().is_none());

    let (mut fresh, _script) = setup(&[Some("BAD-PRIMARY"), Some("GOOD-ALT-1")]);
    let credential = coordinator
        .sign_in(
            &mut fresh,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(credential.uid, "uid-1");
    assert_eq!(session.retry_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn retries_wait_between_keys() {
    let (mut initializer, _script) =
        setup(&[Some("BAD-PRIMARY"), Some("BAD-ALT-1"), Some("GOOD-ALT-2")]);
    let mut session = RetrySession::new();
    let started = tokio::time::Instant::now();

    coordinator()
        .sign_in(
            &mut initializer,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_sequence() {
    let (mut initializer, script) = setup(&[Some("BAD-PRIMARY"), Some("GOOD-ALT-1")]);
    let mut session = RetrySession::new();
    let cancel = CancellationToken::new();

    let coordinator =
        RetryCoordinator::new(RetryPolicy::default().with_delay(Duration::from_secs(60)));
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let err = coordinator
        .sign_in(
            &mut initializer,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CredentialError::Cancelled));
    assert_eq!(*script.attempts.lock(), vec!["BAD-PRIMARY"]);
}

#[tokio::test(start_paused = true)]
async fn diagnostics_record_retries_and_masked_suffix() {
    let script = Arc::new(Script::default());
    let diagnostics = DiagnosticChannel::in_memory();
    let mut initializer = SessionInitializer::new(
        CredentialCandidates::new([Some("BAD-PRIMARY-1111"), Some("GOOD-ALT-2222")]),
        BackendProfile::default(),
        Arc::new(ScriptedConnector {
            script: script.clone(),
        }),
    )
    .with_diagnostics(diagnostics.clone());
    let coordinator =
        RetryCoordinator::new(RetryPolicy::default()).with_diagnostics(diagnostics.clone());
    let mut session = RetrySession::new();

    coordinator
        .sign_in(
            &mut initializer,
            &mut session,
            "ops@autoluxe.com",
            "secret",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let reader = diagnostics.reader();
    assert_eq!(reader.read(DiagnosticKey::RetryCount).as_deref(), Some("1"));
    assert!(
        reader
            .read(DiagnosticKey::LastError)
            .is_some_and(|e| e.contains("API key not valid"))
    );
    let suffix = reader.read(DiagnosticKey::LastUsedSecretSuffix).unwrap();
    assert!(suffix.ends_with("2222"));
    assert!(!suffix.contains("GOOD"));

    coordinator.reset(&mut session);
    assert!(reader.read(DiagnosticKey::RetryCount).is_none());
    assert!(reader.read(DiagnosticKey::LastError).is_none());
}

#[tokio::test(start_paused = true)]
async fn queued_login_keeps_diagnostics_of_running_login() {
    let script = Arc::new(Script::default());
    let diagnostics = DiagnosticChannel::in_memory();
    let service = Arc::new(AdminAuthService::new(
        CredentialCandidates::new([Some("BAD-PRIMARY"), Some("GOOD-ALT-1")]),
        BackendProfile::default(),
        Arc::new(ScriptedConnector {
            script: script.clone(),
        }),
        RetryPolicy::default().with_delay(Duration::from_secs(30)),
        diagnostics.clone(),
        "autoluxe.com",
    ));
    let reader = diagnostics.reader();
    let cancel = CancellationToken::new();

    let running = tokio::spawn({
        let service = Arc::clone(&service);
        let cancel = cancel.clone();
        async move { service.login("ops@autoluxe.com", "secret", &cancel).await }
    });
    // Let the first login record its rejection and park in the retry delay.
    while reader.read(DiagnosticKey::RetryCount).is_none() {
        tokio::task::yield_now().await;
    }

    let queued = tokio::spawn({
        let service = Arc::clone(&service);
        let cancel = cancel.clone();
        async move { service.login("ops@autoluxe.com", "secret", &cancel).await }
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(reader.read(DiagnosticKey::RetryCount).as_deref(), Some("1"));
    assert!(
        reader
            .read(DiagnosticKey::LastError)
            .is_some_and(|e| e.contains("API key not valid"))
    );

    let first = running.await.unwrap().unwrap();
    assert_eq!(first.retries, 1);
    let second = queued.await.unwrap().unwrap();
    assert_eq!(second.retries, 0);
    // The second login starts from a clean slate once it holds the lock.
    assert!(reader.read(DiagnosticKey::RetryCount).is_none());
}
