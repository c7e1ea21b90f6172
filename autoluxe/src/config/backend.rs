//! Hosted backend (identity + project) configuration.

use secrecy::SecretString;

use super::env::{self, Lookup};

/// Default base URL of the hosted identity REST API.
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

/// Settings for the hosted backend.
///
/// The primary API key and its alternates are kept in declaration order;
/// blank alternates are preserved as `None` so the candidate list mirrors
/// what was configured.
#[derive(Debug, Default)]
pub struct BackendConfig {
    pub api_key: Option<SecretString>,
    pub alternate_api_keys: Vec<Option<SecretString>>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub measurement_id: Option<String>,
    pub identity_endpoint: String,
}

impl BackendConfig {
    /// Load from an environment lookup.
    ///
    /// Supported env vars:
    /// - `AUTOLUXE_BACKEND_API_KEY`: primary key
    /// - `AUTOLUXE_BACKEND_ALTERNATE_API_KEY`: a single alternate
    /// - `AUTOLUXE_BACKEND_ALTERNATE_API_KEYS`: comma separated alternates
    /// - `AUTOLUXE_BACKEND_AUTH_DOMAIN`, `AUTOLUXE_BACKEND_PROJECT_ID`,
    ///   `AUTOLUXE_BACKEND_STORAGE_BUCKET`, `AUTOLUXE_BACKEND_MESSAGING_SENDER_ID`,
    ///   `AUTOLUXE_BACKEND_APP_ID`, `AUTOLUXE_BACKEND_MEASUREMENT_ID`
    /// - `AUTOLUXE_IDENTITY_ENDPOINT`: override of the identity API base URL
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        let mut alternate_api_keys: Vec<Option<SecretString>> = Vec::new();

        if let Some(single) = lookup("AUTOLUXE_BACKEND_ALTERNATE_API_KEY") {
            alternate_api_keys.push(non_blank_secret(&single));
        }
        if let Some(list) = lookup("AUTOLUXE_BACKEND_ALTERNATE_API_KEYS") {
            alternate_api_keys.extend(list.split(',').map(non_blank_secret));
        }

        Self {
            api_key: lookup("AUTOLUXE_BACKEND_API_KEY")
                .as_deref()
                .and_then(non_blank_secret),
            alternate_api_keys,
            auth_domain: env::string(lookup, "AUTOLUXE_BACKEND_AUTH_DOMAIN"),
            project_id: env::string(lookup, "AUTOLUXE_BACKEND_PROJECT_ID"),
            storage_bucket: env::string(lookup, "AUTOLUXE_BACKEND_STORAGE_BUCKET"),
            messaging_sender_id: env::string(lookup, "AUTOLUXE_BACKEND_MESSAGING_SENDER_ID"),
            app_id: env::string(lookup, "AUTOLUXE_BACKEND_APP_ID"),
            measurement_id: env::string(lookup, "AUTOLUXE_BACKEND_MEASUREMENT_ID"),
            identity_endpoint: env::string(lookup, "AUTOLUXE_IDENTITY_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_IDENTITY_ENDPOINT.to_string()),
        }
    }

    /// Which settings are present, by name. Values are never exposed.
    pub fn presence(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("api_key", self.api_key.is_some()),
            (
                "alternate_api_keys",
                self.alternate_api_keys.iter().any(Option::is_some),
            ),
            ("auth_domain", self.auth_domain.is_some()),
            ("project_id", self.project_id.is_some()),
            ("storage_bucket", self.storage_bucket.is_some()),
            ("messaging_sender_id", self.messaging_sender_id.is_some()),
            ("app_id", self.app_id.is_some()),
            ("measurement_id", self.measurement_id.is_some()),
        ]
    }
}

fn non_blank_secret(raw: &str) -> Option<SecretString> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| SecretString::from(trimmed.to_string()))
}
