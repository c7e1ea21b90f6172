//! Top-level application configuration.

use crate::api::server::ApiServerConfig;
use crate::credentials::RetryPolicy;
use crate::utils::http_client::HttpClientConfig;

use super::backend::BackendConfig;
use super::env::{self, Lookup};
use super::search::SearchConfig;

/// Default admin email domain.
pub const DEFAULT_ADMIN_EMAIL_DOMAIN: &str = "autoluxe.com";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Everything the server needs at startup.
#[derive(Debug)]
pub struct AppConfig {
    pub environment: Environment,
    /// Diagnostic channel opt-in.
    pub diagnostics_enabled: bool,
    pub admin_email_domain: String,
    pub database_url: String,
    pub log_dir: String,
    pub server: ApiServerConfig,
    pub backend: BackendConfig,
    pub search: SearchConfig,
    pub retry: RetryPolicy,
    pub http: HttpClientConfig,
}

impl AppConfig {
    /// Load `.env` (if present) and then the process environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(&env::process_env)
    }

    /// Supported env vars (besides those of the nested configs):
    /// - `AUTOLUXE_ENV`: `production` or anything else (development)
    /// - `AUTOLUXE_DIAGNOSTICS`: explicit diagnostics opt-in/out
    /// - `AUTOLUXE_ADMIN_EMAIL_DOMAIN` (default: `autoluxe.com`)
    /// - `DATABASE_URL` (default: `sqlite:autoluxe.db?mode=rwc`)
    /// - `LOG_DIR` (default: `logs`)
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        let environment = match env::string(lookup, "AUTOLUXE_ENV")
            .map(|v| v.to_ascii_lowercase())
            .as_deref()
        {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let diagnostics_enabled = env::flag(lookup, "AUTOLUXE_DIAGNOSTICS")
            .unwrap_or(!environment.is_production());

        let admin_email_domain = env::string(lookup, "AUTOLUXE_ADMIN_EMAIL_DOMAIN")
            .map(|d| d.trim_start_matches('@').to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL_DOMAIN.to_string());

        Self {
            environment,
            diagnostics_enabled,
            admin_email_domain,
            database_url: env::string(lookup, "DATABASE_URL")
                .unwrap_or_else(|| "sqlite:autoluxe.db?mode=rwc".to_string()),
            log_dir: env::string(lookup, "LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            server: ApiServerConfig::from_lookup(lookup),
            backend: BackendConfig::from_lookup(lookup),
            search: SearchConfig::from_lookup(lookup),
            retry: RetryPolicy::from_lookup(lookup),
            http: HttpClientConfig::from_lookup(lookup),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::map_lookup;

    #[test]
    fn test_diagnostics_default_follows_environment() {
        let dev = AppConfig::from_lookup(&map_lookup(&[]));
        assert_eq!(dev.environment, Environment::Development);
        assert!(dev.diagnostics_enabled);

        let prod = AppConfig::from_lookup(&map_lookup(&[("AUTOLUXE_ENV", "production")]));
        assert!(prod.environment.is_production());
        assert!(!prod.diagnostics_enabled);
    }

    #[test]
    fn test_diagnostics_explicit_opt_in_wins() {
        let prod = AppConfig::from_lookup(&map_lookup(&[
            ("AUTOLUXE_ENV", "production"),
            ("AUTOLUXE_DIAGNOSTICS", "on"),
        ]));
        assert!(prod.diagnostics_enabled);

        let dev = AppConfig::from_lookup(&map_lookup(&[("AUTOLUXE_DIAGNOSTICS", "off")]));
        assert!(!dev.diagnostics_enabled);
    }

    #[test]
    fn test_admin_domain_normalised() {
        let config = AppConfig::from_lookup(&map_lookup(&[(
            "AUTOLUXE_ADMIN_EMAIL_DOMAIN",
            "@AutoLuxe.ae",
        )]));
        assert_eq!(config.admin_email_domain, "autoluxe.ae");
    }
}
