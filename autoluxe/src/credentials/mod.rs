//! Credential management module.
//!
//! API-key fallback for the hosted identity backend: when the service
//! rejects the key in use, the next configured key is tried, up to one
//! attempt per key.
//!
//! # Architecture
//!
//! - [`CredentialCandidates`]: Ordered primary + alternate keys
//! - [`SessionInitializer`]: Owns the active session handle, walks keys forward
//! - [`RetryCoordinator`]: Retries sign-in on key rejection, with a caller-owned [`RetrySession`]
//! - [`DiagnosticChannel`] / [`DiagnosticSnapshot`]: Opt-in, masked observability
//! - [`AdminAuthService`]: Admin login and token verification on top of the above

mod backend;
mod candidates;
mod diagnostics;
mod error;
mod retry;
mod service;
mod session;
mod snapshot;

// Backend implementations
pub mod platforms;

pub use backend::{
    BackendConnector, BackendProfile, BackendSession, SessionCredential, SessionOptions,
    VerifiedUser,
};
pub use candidates::{CredentialCandidates, MaskedSecret, VISIBLE_SUFFIX_LEN};
pub use diagnostics::{
    DiagnosticChannel, DiagnosticKey, DiagnosticReader, DiagnosticStore, DiagnosticStoreError,
    SessionDiagnosticStore,
};
pub use error::{AuthErrorKind, CredentialError, SDK_API_KEY_NOT_VALID};
pub use retry::{DEFAULT_RETRY_DELAY, RetryCoordinator, RetryPolicy, RetrySession};
pub use service::{AdminAuthError, AdminAuthService, AdminLogin, LoginFailure};
pub use session::{DEFAULT_RELEASE_TIMEOUT, HandleRecord, SessionInitializer};
pub use snapshot::{
    CandidateSummary, ConfigPresence, DiagnosticSnapshot, HandleSnapshot, RetrySnapshot,
    UNAVAILABLE,
};
