// Configuration for:
// - Server listening address/port
// - Storage backend connection string
// - Upstream asset source for the HTTP fetcher
// - Cache settings (expiry, refresh delay, size caps, snapshot age)

use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_STORAGE_KEY: &str = "wallet_asset_cache";

/// Settings for the in-memory tier
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a record counts as fresh
    pub cache_expiry: Duration,
    /// Delay before the background refresh armed by a cache hit fires
    pub refresh_interval: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_expiry: Duration::from_secs(300),
            refresh_interval: Duration::from_secs(60),
            max_entries: 100,
        }
    }
}

/// Settings for the persisted snapshot
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub storage_key: String,
    pub max_addresses: usize,
    /// Snapshots older than this are discarded on load
    pub max_age: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_addresses: 10,
            max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub upstream_url: String,
    pub fetch_timeout: Duration,
    pub fetch_max_retries: usize,
    pub cache: CacheConfig,
    pub store: StoreConfig,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let cache_defaults = CacheConfig::default();
        let store_defaults = StoreConfig::default();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:asset_cache.db".to_string());
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env_or("SERVER_PORT", 8080);
        let upstream_url =
            env::var("UPSTREAM_URL").unwrap_or_else(|_| "http://127.0.0.1:9000".to_string());
        let fetch_timeout = env_secs("FETCH_TIMEOUT_SECS", Duration::from_secs(15));
        let fetch_max_retries = env_or("FETCH_MAX_RETRIES", 2);

        let cache = CacheConfig {
            cache_expiry: env_secs("ASSET_CACHE_EXPIRY_SECS", cache_defaults.cache_expiry),
            refresh_interval: env_secs("ASSET_CACHE_REFRESH_SECS", cache_defaults.refresh_interval),
            max_entries: env_or("ASSET_CACHE_MAX_ENTRIES", cache_defaults.max_entries),
        };

        let store = StoreConfig {
            storage_key: env::var("ASSET_CACHE_STORAGE_KEY")
                .unwrap_or(store_defaults.storage_key),
            max_addresses: env_or("ASSET_CACHE_MAX_ADDRESSES", store_defaults.max_addresses),
            max_age: env_secs("ASSET_CACHE_MAX_AGE_SECS", store_defaults.max_age),
        };

        Self {
            database_url,
            server_host,
            server_port,
            upstream_url,
            fetch_timeout,
            fetch_max_retries,
            cache,
            store,
        }
    }
}
