use crate::cache::{AssetCacheKey, AssetCacheManager};
use crate::config::Config;
use crate::fetch::AssetFetcher;
use std::sync::Arc;

/// Builds the fetcher that serves one cache key
pub type FetcherFactory = Arc<dyn Fn(&AssetCacheKey) -> Arc<dyn AssetFetcher> + Send + Sync>;

pub struct AppState {
    pub config: Config,
    pub cache: Arc<AssetCacheManager>,
    pub fetchers: FetcherFactory,
}
