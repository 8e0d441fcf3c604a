pub mod keys;
pub mod manager;
mod refresh;

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Config;
use crate::storage::{SnapshotStore, StorageBackend};

pub use keys::AssetCacheKey;
pub use manager::AssetCacheManager;

/// Build the cache manager over `backend` using the configured limits
pub fn init_cache(
    config: &Config,
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
) -> AssetCacheManager {
    let store = SnapshotStore::new(backend, clock.clone(), config.store.clone());
    AssetCacheManager::new(store, clock, config.cache.clone())
}
