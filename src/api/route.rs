use crate::{
    api::{
        error::ApiError,
        response::{with_data, ApiResponse},
    },
    models::{Asset, CacheStats, SnapshotStats},
    state::AppState,
    validation::{validate_address, validate_cache_key},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

// Query parameters shared by the /assets endpoints
#[derive(Deserialize)]
pub struct AssetsQuery {
    address: String,
    chain: String,
    assets: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub memory: CacheStats,
    pub snapshot: Option<SnapshotStats>,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/assets", get(get_assets))
        .route("/assets/refresh", post(refresh_assets))
        .route("/assets/invalidate", post(invalidate_assets))
        .route("/cache", delete(clear_cache))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/{address}", delete(clear_address))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

// GET /assets handler
async fn get_assets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AssetsQuery>,
) -> Result<ApiResponse<Vec<Asset>>, ApiError> {
    let key = validate_cache_key(&params.address, &params.chain, &params.assets)?;
    let fetcher = (state.fetchers)(&key);

    let assets = state.cache.get(&key, fetcher).await;
    Ok(with_data(assets))
}

// POST /assets/refresh handler
async fn refresh_assets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AssetsQuery>,
) -> Result<ApiResponse<Vec<Asset>>, ApiError> {
    let key = validate_cache_key(&params.address, &params.chain, &params.assets)?;
    info!("Processing refresh request for {}", key);
    let fetcher = (state.fetchers)(&key);

    let assets = state.cache.force_refresh(&key, fetcher).await;
    Ok(with_data(assets))
}

// POST /assets/invalidate handler
async fn invalidate_assets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AssetsQuery>,
) -> Result<StatusCode, ApiError> {
    let key = validate_cache_key(&params.address, &params.chain, &params.assets)?;

    state.cache.invalidate_for_balance_change(&key).await;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /cache/{address} handler
async fn clear_address(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<StatusCode, ApiError> {
    validate_address(&address)?;
    info!("Clearing cached assets for address: {}", address);

    state.cache.clear_for_address(&address).await;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /cache handler
async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.cache.clear_all().await;
    StatusCode::NO_CONTENT
}

// GET /cache/stats handler
async fn cache_stats(State(state): State<Arc<AppState>>) -> ApiResponse<StatsResponse> {
    let memory = state.cache.stats().await;
    let snapshot = state.cache.store().stats().await;

    with_data(StatsResponse { memory, snapshot })
}
