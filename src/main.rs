//! shopfloor-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use shopfloor_gateway::api;
use shopfloor_gateway::app_state::AppState;
use shopfloor_gateway::cache::CacheStore;
use shopfloor_gateway::cache::memory::InMemoryCache;
use shopfloor_gateway::config::{GatewayConfig, LogFormat, MetadataBackend};
use shopfloor_gateway::metadata::MetadataStore;
use shopfloor_gateway::metadata::memory::InMemoryMetadataStore;
use shopfloor_gateway::metadata::postgres::PostgresMetadataStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, backend = ?config.metadata_backend, "starting shopfloor-gateway");

    // Metadata backend
    let metadata: Arc<dyn MetadataStore> = match config.metadata_backend {
        MetadataBackend::Memory => match &config.metadata_seed_path {
            Some(path) => Arc::new(
                InMemoryMetadataStore::load_seed_file(path)
                    .await
                    .context("loading metadata seed")?,
            ),
            None => {
                tracing::warn!("no METADATA_SEED_PATH set, starting with empty metadata");
                Arc::new(InMemoryMetadataStore::new())
            }
        },
        MetadataBackend::Postgres => Arc::new(
            PostgresMetadataStore::connect(&config.pg_settings())
                .await
                .context("connecting to PostgreSQL")?,
        ),
    };

    // Status cache + services
    let cache = Arc::new(InMemoryCache::new());
    let app_state = AppState::new(&config, metadata, Arc::clone(&cache) as Arc<dyn CacheStore>);

    // Periodic housekeeping: orphaned subscriptions and expired cache entries
    if let Some(period) = config.reconcile_interval() {
        let dispatcher = Arc::clone(&app_state.dispatcher);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                dispatcher.reconcile().await;
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "purged expired cache entries");
                }
            }
        });
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, api::build_app(app_state)).await?;

    Ok(())
}
