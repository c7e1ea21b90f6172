use std::sync::Arc;

use anyhow::Context;
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;

use autoluxe::api::{ApiServer, AppState};
use autoluxe::catalog::{CatalogService, HttpSearchIndex};
use autoluxe::config::AppConfig;
use autoluxe::credentials::platforms::IdentityConnector;
use autoluxe::credentials::{
    AdminAuthService, BackendProfile, CredentialCandidates, DiagnosticChannel,
};
use autoluxe::database::{self, SqlxDocumentStore};
use autoluxe::utils::http_client::build_http_client;
use autoluxe::{logging, panic_hook};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load();

    let (logging_config, _log_guard) =
        logging::init_logging(&config.log_dir).context("failed to initialize logging")?;
    panic_hook::install(&config.log_dir);

    tracing::info!(
        environment = ?config.environment,
        diagnostics = config.diagnostics_enabled,
        "Starting autoluxe v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pool = database::init_pool(&config.database_url).await?;
    database::run_migrations(&pool).await?;

    let http_client = build_http_client(&config.http);

    let mut catalog = CatalogService::new(Arc::new(SqlxDocumentStore::new(pool.clone())));
    match HttpSearchIndex::from_config(http_client.clone(), &config.search) {
        Some(index) => {
            tracing::info!(index = index.index_name(), "Search index configured");
            catalog = catalog.with_search(Arc::new(index));
        }
        None => tracing::warn!("Search credentials missing; search and reindex are disabled"),
    }

    let candidates = CredentialCandidates::from_config(&config.backend);
    if !candidates.has_primary() {
        tracing::warn!("Primary backend API key is not configured; admin sign-in will fail");
    }
    tracing::info!(
        configured = candidates.present_count(),
        slots = candidates.len(),
        "Loaded backend API keys"
    );

    let diagnostics = if config.diagnostics_enabled {
        DiagnosticChannel::in_memory()
    } else {
        DiagnosticChannel::disabled()
    };
    let mut presence = config.backend.presence();
    presence.extend(config.search.presence());

    let admin_auth = AdminAuthService::new(
        candidates,
        BackendProfile::from_config(&config.backend),
        Arc::new(IdentityConnector::new(
            http_client,
            config.backend.identity_endpoint.clone(),
        )),
        config.retry.clone(),
        diagnostics,
        config.admin_email_domain.clone(),
    )
    .with_config_presence(presence);

    let state = AppState::new()
        .with_environment(config.environment)
        .with_catalog(Arc::new(catalog))
        .with_admin_auth(Arc::new(admin_auth))
        .with_db_pool(pool.clone())
        .with_logging_config(logging_config.clone());

    let server = ApiServer::with_state(config.server.clone(), state);
    let shutdown = server.cancel_token();
    logging_config.start_retention_cleanup(shutdown.child_token());
    spawn_signal_handler(shutdown);

    server.run().await?;

    pool.close().await;
    tracing::info!("autoluxe stopped");
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });
}
