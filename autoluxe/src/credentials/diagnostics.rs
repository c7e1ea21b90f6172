//! Diagnostic channel for the credential retry flow.
//!
//! A small key/value surface that records the retry counter, the last
//! retryable error and the masked suffix of the key in use. Only code in
//! this module's parent writes to it; everything else gets a read-only
//! [`DiagnosticReader`].
//!
//! The channel is disabled unless a store is injected. Store failures never
//! reach the caller; they are logged at debug level and dropped.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use super::candidates::MaskedSecret;

/// Keys of the diagnostic surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum DiagnosticKey {
    RetryCount,
    LastError,
    LastUsedSecretSuffix,
}

impl DiagnosticKey {
    pub const ALL: [DiagnosticKey; 3] = [
        DiagnosticKey::RetryCount,
        DiagnosticKey::LastError,
        DiagnosticKey::LastUsedSecretSuffix,
    ];

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Error)]
#[error("diagnostic store unavailable: {0}")]
pub struct DiagnosticStoreError(pub String);

/// Backing store for diagnostic values.
pub trait DiagnosticStore: Send + Sync {
    fn read(&self, key: DiagnosticKey) -> Result<Option<String>, DiagnosticStoreError>;
    fn write(&self, key: DiagnosticKey, value: String) -> Result<(), DiagnosticStoreError>;
    fn remove(&self, key: DiagnosticKey) -> Result<(), DiagnosticStoreError>;
}

/// Process-local store, scoped to the lifetime of the server.
#[derive(Default)]
pub struct SessionDiagnosticStore {
    entries: DashMap<DiagnosticKey, String>,
}

impl SessionDiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticStore for SessionDiagnosticStore {
    fn read(&self, key: DiagnosticKey) -> Result<Option<String>, DiagnosticStoreError> {
        Ok(self.entries.get(&key).map(|value| value.clone()))
    }

    fn write(&self, key: DiagnosticKey, value: String) -> Result<(), DiagnosticStoreError> {
        self.entries.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: DiagnosticKey) -> Result<(), DiagnosticStoreError> {
        self.entries.remove(&key);
        Ok(())
    }
}

/// Write side of the diagnostic surface.
#[derive(Clone, Default)]
pub struct DiagnosticChannel {
    store: Option<Arc<dyn DiagnosticStore>>,
}

impl DiagnosticChannel {
    /// A channel that records nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(store: Arc<dyn DiagnosticStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Enabled channel backed by a fresh [`SessionDiagnosticStore`].
    pub fn in_memory() -> Self {
        Self::enabled(Arc::new(SessionDiagnosticStore::new()))
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn reader(&self) -> DiagnosticReader {
        DiagnosticReader {
            store: self.store.clone(),
        }
    }

    pub(super) fn record_retry(&self, retry_count: u32, last_error: &str) {
        self.write(DiagnosticKey::RetryCount, retry_count.to_string());
        self.write(DiagnosticKey::LastError, last_error.to_string());
    }

    pub(super) fn record_secret_suffix(&self, masked: &MaskedSecret) {
        self.write(DiagnosticKey::LastUsedSecretSuffix, masked.to_string());
    }

    pub(super) fn clear_retry_state(&self) {
        for key in [DiagnosticKey::RetryCount, DiagnosticKey::LastError] {
            if let Some(store) = &self.store
                && let Err(e) = store.remove(key)
            {
                debug!(key = key.as_str(), error = %e, "Failed to clear diagnostic value");
            }
        }
    }

    fn write(&self, key: DiagnosticKey, value: String) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.write(key, value) {
            debug!(key = key.as_str(), error = %e, "Failed to record diagnostic value");
        }
    }
}

/// Read side of the diagnostic surface.
#[derive(Clone, Default)]
pub struct DiagnosticReader {
    store: Option<Arc<dyn DiagnosticStore>>,
}

impl DiagnosticReader {
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Current value, `None` when unset, disabled or unreadable.
    pub fn read(&self, key: DiagnosticKey) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.read(key) {
            Ok(value) => value,
            Err(e) => {
                debug!(key = key.as_str(), error = %e, "Failed to read diagnostic value");
                None
            }
        }
    }
}
