use asset_cache_service::{
    cache::{self, AssetCacheKey},
    clock::{Clock, SystemClock},
    config::Config,
    fetch::FetchError,
    storage::{SqliteStorage, StorageBackend},
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // Set up storage
    println!("Opening storage at {}...", config.database_url);
    let storage: Arc<dyn StorageBackend> = Arc::new(SqliteStorage::connect(&config.database_url).await?);
    println!("✅ Storage ready!");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let manager = cache::init_cache(&config, storage, clock);
    manager.wait_until_loaded().await;

    let stats = manager.stats().await;
    println!("Entries restored from snapshot: {}", stats.size);

    let key = AssetCacheKey::new("0x8ba1f109551bd432803012645ac136ddd64dba72", "ethereum", "native,erc20");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let fetcher = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, FetchError>(vec![json!({ "symbol": "ETH", "balance": "1.5" })]) }
    });

    // First read: miss unless a fresh snapshot was restored
    println!("Reading assets for {}...", key);
    let assets = manager.get(&key, fetcher.clone()).await;
    println!("✅ Got {} assets (fetcher calls: {})", assets.len(), calls.load(Ordering::SeqCst));

    // Second read must be served from memory
    let before = calls.load(Ordering::SeqCst);
    let again = manager.get(&key, fetcher.clone()).await;
    if again != assets || calls.load(Ordering::SeqCst) != before {
        println!("❌ ERROR: second read was not a cache hit!");
        return Err("Cache hit test failed".into());
    }
    println!("✅ Second read served from cache");

    // Invalidate and read again
    manager.invalidate_for_balance_change(&key).await;
    manager.get(&key, fetcher.clone()).await;
    if calls.load(Ordering::SeqCst) != before + 1 {
        println!("❌ ERROR: invalidated entry was not refetched!");
        return Err("Invalidation test failed".into());
    }
    println!("✅ Invalidated entry refetched");

    match manager.store().stats().await {
        Some(snapshot) => println!(
            "Snapshot: {} entries, {} addresses, written {}ms ago",
            snapshot.size, snapshot.addresses, snapshot.age
        ),
        None => println!("❌ No snapshot persisted"),
    }

    println!("All tests completed successfully!");
    Ok(())
}
