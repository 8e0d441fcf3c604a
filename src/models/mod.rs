// Cached record and stats models shared by the cache, the snapshot store and the API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::keys::AssetCacheKey;

/// An asset descriptor as handed out by the fetcher. The cache never looks inside.
pub type Asset = Value;

/// One cached asset listing plus its freshness timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAssets {
    pub assets: Vec<Asset>,
    /// Unix millis of the last successful refresh, 0 once invalidated
    pub last_updated: i64,
    pub address: String,
    pub chain_type: String,
    pub supported_assets_key: String,
}

impl CachedAssets {
    pub fn new(key: &AssetCacheKey, assets: Vec<Asset>, last_updated: i64) -> Self {
        Self {
            assets,
            last_updated,
            address: key.address.clone(),
            chain_type: key.chain_type.clone(),
            supported_assets_key: key.supported_assets_key.clone(),
        }
    }
}

/// Snapshot of the in-memory tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub addresses: Vec<String>,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
}

/// Snapshot of the persisted tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotStats {
    pub size: usize,
    pub addresses: usize,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
    /// Millis since the snapshot was written
    pub age: i64,
}
