pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod fetch;
pub mod models;
pub mod state;
pub mod storage;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use cache::{AssetCacheKey, AssetCacheManager};
pub use clock::{Clock, ManualClock, SystemClock};
pub use fetch::{AssetFetcher, FetchError, HttpAssetFetcher};
pub use models::{Asset, CacheStats, CachedAssets, SnapshotStats};
pub use storage::{MemoryStorage, SnapshotStore, SqliteStorage, StorageBackend, StorageError};
pub use validation::{validate_address, validate_cache_key};
pub use api::error::ApiError;
pub use api::response::ApiResponse;
pub use api::route::{create_router, AssetsQuery};
