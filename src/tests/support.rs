//! Shared fixtures for the cache, snapshot and storage tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::{
    cache::{AssetCacheKey, AssetCacheManager},
    clock::ManualClock,
    config::{CacheConfig, StoreConfig},
    fetch::{AssetFetcher, FetchError},
    models::{Asset, CachedAssets},
    storage::{MemoryStorage, SnapshotStore, StorageBackend, StorageError},
};

/// Realistic wall-clock start so that an invalidated record (0) is always stale
pub const BASE_MILLIS: i64 = 1_700_000_000_000;

/// Background refresh delay used by every test cache
pub const REFRESH_SECS: u64 = 30;

pub const ADDRESS_A: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";
pub const ADDRESS_B: &str = "0xab5801a7d398351b8be11c439e05c5b3259aec9b";

pub fn asset(symbol: &str) -> Asset {
    json!({ "symbol": symbol, "balance": "1.0" })
}

pub fn key(address: &str, chain: &str) -> AssetCacheKey {
    AssetCacheKey::new(address, chain, "native,erc20")
}

pub fn record(address: &str, chain: &str, last_updated: i64) -> (String, CachedAssets) {
    let key = key(address, chain);
    let record = CachedAssets::new(&key, vec![asset(chain)], last_updated);
    (key.to_string(), record)
}

pub fn cache_config(expiry_ms: u64, max_entries: usize) -> CacheConfig {
    CacheConfig {
        cache_expiry: Duration::from_millis(expiry_ms),
        refresh_interval: Duration::from_secs(REFRESH_SECS),
        max_entries,
    }
}

pub fn store_config() -> StoreConfig {
    StoreConfig {
        storage_key: "test_asset_cache".to_string(),
        max_addresses: 10,
        max_age: Duration::from_secs(3600),
    }
}

pub struct Harness {
    pub cache: AssetCacheManager,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<MemoryStorage>,
}

impl Harness {
    pub async fn new(cache_config: CacheConfig) -> Self {
        Self::with_storage(cache_config, Arc::new(MemoryStorage::new())).await
    }

    pub async fn with_storage(cache_config: CacheConfig, storage: Arc<MemoryStorage>) -> Self {
        let clock = Arc::new(ManualClock::new(BASE_MILLIS));
        let store = SnapshotStore::new(storage.clone(), clock.clone(), store_config());
        let cache = AssetCacheManager::new(store, clock.clone(), cache_config);
        cache.wait_until_loaded().await;

        Self {
            cache,
            clock,
            storage,
        }
    }

    /// A second view on the same storage, as a restarted process would see it
    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(self.storage.clone(), self.clock.clone(), store_config())
    }
}

/// Fetcher returning a configurable asset list and counting its calls
pub struct StubFetcher {
    calls: AtomicUsize,
    fail: AtomicBool,
    assets: Mutex<Vec<Asset>>,
}

impl StubFetcher {
    pub fn returning(assets: Vec<Asset>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            assets: Mutex::new(assets),
        })
    }

    pub fn failing() -> Arc<Self> {
        let fetcher = Self::returning(vec![]);
        fetcher.fail.store(true, Ordering::SeqCst);
        fetcher
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_assets(&self, assets: Vec<Asset>) {
        *self.assets.lock().unwrap() = assets;
    }
}

#[async_trait]
impl AssetFetcher for StubFetcher {
    async fn fetch(&self) -> Result<Vec<Asset>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Other("upstream unavailable".to_string()));
        }
        Ok(self.assets.lock().unwrap().clone())
    }
}

/// Fetcher whose first call blocks until `gate` is notified
pub struct GatedFetcher {
    pub gate: Notify,
    first: AtomicBool,
    assets: Vec<Asset>,
}

impl GatedFetcher {
    pub fn new(assets: Vec<Asset>) -> Arc<Self> {
        Arc::new(Self {
            gate: Notify::new(),
            first: AtomicBool::new(true),
            assets,
        })
    }
}

#[async_trait]
impl AssetFetcher for GatedFetcher {
    async fn fetch(&self) -> Result<Vec<Asset>, FetchError> {
        if self.first.swap(false, Ordering::SeqCst) {
            self.gate.notified().await;
        }
        Ok(self.assets.clone())
    }
}

/// Backend where every operation fails
pub struct FailingStorage;

#[async_trait]
impl StorageBackend for FailingStorage {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }
}
