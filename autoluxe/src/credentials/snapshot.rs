//! Read-only diagnostic snapshot of the credential flow.
//!
//! Capturing never fails: every missing or unreadable value is rendered as
//! [`UNAVAILABLE`]. Nothing here can mutate the retry state or the session.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::diagnostics::{DiagnosticKey, DiagnosticReader};
use super::retry::RetrySession;
use super::session::SessionInitializer;

/// Placeholder for values that are not known.
pub const UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Clone, Serialize)]
pub struct ConfigPresence {
    pub name: &'static str,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub total: usize,
    pub present: usize,
    pub active_index: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HandleSnapshot {
    pub key_suffix: String,
    pub auth_domain: String,
    pub project_id: String,
    pub activated_at: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrySnapshot {
    pub retry_count: String,
    pub last_error: String,
    pub last_used_secret_suffix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticSnapshot {
    pub captured_at: DateTime<Utc>,
    pub diagnostics_enabled: bool,
    pub config: Vec<ConfigPresence>,
    pub candidates: CandidateSummary,
    pub handle: HandleSnapshot,
    pub retry: RetrySnapshot,
}

impl DiagnosticSnapshot {
    /// Sample the current state.
    ///
    /// When `session` is given its counter and error are reported; otherwise
    /// the values last written to the diagnostic channel are used.
    pub fn capture(
        presence: &[(&'static str, bool)],
        initializer: &SessionInitializer,
        reader: &DiagnosticReader,
        session: Option<&RetrySession>,
    ) -> Self {
        let candidates = initializer.candidates();
        let profile = initializer.profile();
        let record = initializer.active_record();

        let handle = HandleSnapshot {
            key_suffix: or_unavailable(record.map(|r| r.key.to_string())),
            auth_domain: or_unavailable(profile.auth_domain.clone()),
            project_id: or_unavailable(profile.project_id.clone()),
            activated_at: or_unavailable(record.map(|r| r.activated_at.to_rfc3339())),
            warnings: record.map(|r| r.warnings.clone()).unwrap_or_default(),
        };

        let retry = match session {
            Some(session) => RetrySnapshot {
                retry_count: session.retry_count().to_string(),
                last_error: or_unavailable(session.last_error().map(str::to_string)),
                last_used_secret_suffix: or_unavailable(
                    reader.read(DiagnosticKey::LastUsedSecretSuffix),
                ),
            },
            None => RetrySnapshot {
                retry_count: or_unavailable(reader.read(DiagnosticKey::RetryCount)),
                last_error: or_unavailable(reader.read(DiagnosticKey::LastError)),
                last_used_secret_suffix: or_unavailable(
                    reader.read(DiagnosticKey::LastUsedSecretSuffix),
                ),
            },
        };

        Self {
            captured_at: Utc::now(),
            diagnostics_enabled: reader.is_enabled(),
            config: presence
                .iter()
                .map(|&(name, present)| ConfigPresence { name, present })
                .collect(),
            candidates: CandidateSummary {
                total: candidates.len(),
                present: candidates.present_count(),
                active_index: or_unavailable(
                    initializer.active_index().map(|index| index.to_string()),
                ),
            },
            handle,
            retry,
        }
    }
}

fn or_unavailable(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNAVAILABLE.to_string())
}
