use std::{sync::OnceLock, time::Duration};

use tracing::{debug, warn};

use crate::config::env::{self, Lookup};

/// Default timeout for outbound requests (identity and search services).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Outbound HTTP settings.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
    /// Explicit proxy; system/env proxy settings apply when unset.
    pub proxy_url: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            proxy_url: None,
        }
    }
}

impl HttpClientConfig {
    /// Supported env vars: `AUTOLUXE_HTTP_TIMEOUT_SECS` (default 15),
    /// `AUTOLUXE_HTTP_PROXY`.
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        Self {
            request_timeout: Duration::from_secs(env::parsed(
                lookup,
                "AUTOLUXE_HTTP_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT.as_secs(),
            )),
            proxy_url: env::string(lookup, "AUTOLUXE_HTTP_PROXY"),
        }
    }
}

/// Build the shared `reqwest::Client` for outbound calls.
pub fn build_http_client(config: &HttpClientConfig) -> reqwest::Client {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("autoluxe/", env!("CARGO_PKG_VERSION")));

    if config.request_timeout > Duration::ZERO {
        builder = builder.timeout(config.request_timeout);
    }

    if let Some(url) = config.proxy_url.as_deref() {
        match reqwest::Proxy::all(url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(error) => {
                warn!(proxy_url = %url, error = %error, "Invalid proxy URL; disabling proxy");
                builder = builder.no_proxy();
            }
        }
    }

    builder.build().unwrap_or_else(|error| {
        warn!(error = %error, "Failed to create HTTP client; falling back to reqwest defaults");
        reqwest::Client::new()
    })
}
