//! Hosted search index configuration.

use secrecy::SecretString;

use super::env::{self, Lookup};

/// Default index holding the car catalog.
pub const DEFAULT_SEARCH_INDEX: &str = "autoluxe-dxb";

#[derive(Debug, Default)]
pub struct SearchConfig {
    pub app_id: Option<String>,
    /// Search-only key, used for queries.
    pub search_key: Option<SecretString>,
    /// Write key, needed for reindexing.
    pub admin_key: Option<SecretString>,
    pub index_name: String,
    /// Explicit API host; derived from the app id when unset.
    pub host: Option<String>,
}

impl SearchConfig {
    /// Load from an environment lookup.
    ///
    /// Supported env vars: `AUTOLUXE_SEARCH_APP_ID`, `AUTOLUXE_SEARCH_KEY`,
    /// `AUTOLUXE_SEARCH_ADMIN_KEY`, `AUTOLUXE_SEARCH_INDEX`, `AUTOLUXE_SEARCH_HOST`.
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        Self {
            app_id: env::string(lookup, "AUTOLUXE_SEARCH_APP_ID"),
            search_key: env::string(lookup, "AUTOLUXE_SEARCH_KEY").map(SecretString::from),
            admin_key: env::string(lookup, "AUTOLUXE_SEARCH_ADMIN_KEY").map(SecretString::from),
            index_name: env::string(lookup, "AUTOLUXE_SEARCH_INDEX")
                .unwrap_or_else(|| DEFAULT_SEARCH_INDEX.to_string()),
            host: env::string(lookup, "AUTOLUXE_SEARCH_HOST"),
        }
    }

    /// Queries are possible.
    pub fn has_search_credentials(&self) -> bool {
        self.app_id.is_some() && self.search_key.is_some()
    }

    /// Writes (reindexing) are possible.
    pub fn has_admin_credentials(&self) -> bool {
        self.app_id.is_some() && self.admin_key.is_some()
    }

    /// Base URL of the search API.
    pub fn base_url(&self) -> Option<String> {
        if let Some(host) = &self.host {
            return Some(host.trim_end_matches('/').to_string());
        }
        self.app_id
            .as_ref()
            .map(|app_id| format!("https://{}-dsn.algolia.net", app_id.to_ascii_lowercase()))
    }

    pub fn presence(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("search_app_id", self.app_id.is_some()),
            ("search_key", self.search_key.is_some()),
            ("search_admin_key", self.admin_key.is_some()),
        ]
    }
}
