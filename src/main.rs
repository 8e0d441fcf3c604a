// Initialize configuration
// Set up logging
// Open the storage backend
// Initialize cache and merge the persisted snapshot
// Start HTTP server

use asset_cache_service::{
    api,
    cache::{self, AssetCacheKey},
    clock::{Clock, SystemClock},
    config::Config,
    fetch::{AssetFetcher, HttpAssetFetcher},
    state::{AppState, FetcherFactory},
    storage::{SqliteStorage, StorageBackend},
};

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting asset-cache-service");

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Configuration loaded: {:?}", config);

    // Setup storage backend
    let storage: Arc<dyn StorageBackend> = Arc::new(SqliteStorage::connect(&config.database_url).await?);
    tracing::info!("Storage backend ready");

    // Initialize cache
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(cache::init_cache(&config, storage, clock));
    tracing::info!(
        "Cache initialized with expiry: {:?}, refresh: {:?} and capacity: {}",
        config.cache.cache_expiry,
        config.cache.refresh_interval,
        config.cache.max_entries
    );

    // Every key fetches from the same upstream through one shared client
    let client = HttpAssetFetcher::build_client(&config)?;
    let fetcher_config = config.clone();
    let fetchers: FetcherFactory = Arc::new(move |key: &AssetCacheKey| {
        Arc::new(HttpAssetFetcher::new(client.clone(), &fetcher_config, key)) as Arc<dyn AssetFetcher>
    });

    // Create shared state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        cache,
        fetchers,
    });

    // Start HTTP server
    let app = api::create_router(app_state);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
