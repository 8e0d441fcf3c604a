//! Two-tier asset cache: in-memory records backed by a persisted snapshot.
//!
//! Reads never fail. A fresh record is served straight from memory and arms a
//! background refresh; a stale or missing one is fetched synchronously, with
//! the previous assets (or nothing) as the fallback when the fetch fails.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::keys::AssetCacheKey;
use super::refresh::{spawn_timer, RefreshTimers};
use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::fetch::AssetFetcher;
use crate::models::{Asset, CacheStats, CachedAssets};
use crate::storage::SnapshotStore;

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedAssets>,
    /// Ticket of the last fetch applied to each key
    applied: HashMap<String, u64>,
    timers: RefreshTimers,
}

impl CacheState {
    /// A completion is applied only if no later-started fetch already landed
    fn accepts(&self, key: &str, ticket: u64) -> bool {
        self.applied.get(key).map_or(true, |&last| ticket > last)
    }

    fn remove(&mut self, key: &str) -> Option<CachedAssets> {
        self.applied.remove(key);
        self.timers.cancel(key);
        self.entries.remove(key)
    }

    /// Drop the oldest entries until at most `max_entries` remain. `keep` is
    /// evicted last, and only when the cap is zero.
    fn evict_overflow(&mut self, max_entries: usize, keep: Option<&str>) -> usize {
        if self.entries.len() <= max_entries {
            return 0;
        }
        let surplus = self.entries.len() - max_entries;
        let keep = keep.filter(|_| max_entries > 0);

        let mut by_age: Vec<(String, i64)> = self
            .entries
            .iter()
            .filter(|(key, _)| Some(key.as_str()) != keep)
            .map(|(key, record)| (key.clone(), record.last_updated))
            .collect();
        by_age.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut evicted = 0;
        for (key, _) in by_age.into_iter().take(surplus) {
            self.remove(&key);
            evicted += 1;
        }
        evicted
    }
}

struct Shared {
    state: Mutex<CacheState>,
    store: SnapshotStore,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    tickets: AtomicU64,
    /// Parent of every refresh timer token
    shutdown: CancellationToken,
}

impl Shared {
    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_fresh(&self, record: &CachedAssets, now: i64) -> bool {
        let expiry = i64::try_from(self.config.cache_expiry.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(record.last_updated) < expiry
    }

    /// (Re)arm the single background refresh for `key`
    fn arm_refresh(
        self: &Arc<Self>,
        state: &mut CacheState,
        key: &str,
        fetcher: Arc<dyn AssetFetcher>,
    ) {
        let (id, token) = state.timers.arm(key, &self.shutdown);
        let weak = Arc::downgrade(self);
        let key = key.to_string();

        spawn_timer(token, self.config.refresh_interval, async move {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            shared.state.lock().await.timers.finish(&key, id);
            shared.background_refresh(&key, fetcher).await;
        });
    }

    /// Refresh fired by a timer. Updates an existing record in place and never persists.
    async fn background_refresh(&self, key: &str, fetcher: Arc<dyn AssetFetcher>) {
        let ticket = self.next_ticket();
        let assets = match fetcher.fetch().await {
            Ok(assets) => assets,
            Err(e) => {
                warn!("Background asset refresh failed for {}: {}", key, e);
                return;
            }
        };

        let mut state = self.state.lock().await;
        if !state.accepts(key, ticket) {
            debug!("Discarding out-of-order background refresh for {}", key);
            return;
        }

        let now = self.clock.now_millis();
        let CacheState {
            entries, applied, ..
        } = &mut *state;
        match entries.get_mut(key) {
            Some(record) => {
                record.assets = assets;
                record.last_updated = record.last_updated.max(now);
                applied.insert(key.to_string(), ticket);
                debug!("Background refresh updated {}", key);
            }
            None => debug!("Dropping background refresh for removed key {}", key),
        }
    }

    /// Synchronous refresh used on a miss, a stale record or a forced refresh
    async fn refresh_now(
        self: &Arc<Self>,
        key: &AssetCacheKey,
        raw: String,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Vec<Asset> {
        let ticket = self.next_ticket();
        let assets = match fetcher.fetch().await {
            Ok(assets) => assets,
            Err(e) => {
                warn!("Failed to fetch assets for {}: {}", raw, e);
                let state = self.state.lock().await;
                return state
                    .entries
                    .get(&raw)
                    .map(|record| record.assets.clone())
                    .unwrap_or_default();
            }
        };

        let snapshot = {
            let mut state = self.state.lock().await;
            if state.accepts(&raw, ticket) {
                let now = self.clock.now_millis();
                let last_updated = state
                    .entries
                    .get(&raw)
                    .map_or(now, |record| record.last_updated.max(now));

                state
                    .entries
                    .insert(raw.clone(), CachedAssets::new(key, assets.clone(), last_updated));
                state.applied.insert(raw.clone(), ticket);

                let evicted = state.evict_overflow(self.config.max_entries, Some(&raw));
                if evicted > 0 {
                    debug!("Evicted {} asset cache entries", evicted);
                }
                if state.entries.contains_key(&raw) {
                    self.arm_refresh(&mut state, &raw, fetcher);
                }
                Some(state.entries.clone())
            } else {
                debug!("Discarding out-of-order refresh for {}", raw);
                None
            }
        };

        if let Some(entries) = snapshot {
            self.store.save(&entries).await;
        }
        assets
    }

    /// Fill keys not already in memory from the persisted snapshot
    async fn merge_persisted(&self) {
        let Some(persisted) = self.store.load().await else {
            debug!("No persisted asset cache to merge");
            return;
        };

        let mut state = self.state.lock().await;
        let mut merged = 0;
        for (key, record) in persisted {
            if let Entry::Vacant(slot) = state.entries.entry(key) {
                slot.insert(record);
                merged += 1;
            }
        }
        let evicted = state.evict_overflow(self.config.max_entries, None);

        info!(
            "Merged {} persisted asset cache entries ({} evicted)",
            merged, evicted
        );
    }
}

/// Asset cache shared by every consumer of the process.
///
/// Construct once inside a tokio runtime and share behind an `Arc`. Dropping
/// it cancels every pending background refresh.
pub struct AssetCacheManager {
    shared: Arc<Shared>,
    loaded: watch::Receiver<bool>,
}

impl AssetCacheManager {
    /// Create the manager and start merging the persisted snapshot in the background
    pub fn new(store: SnapshotStore, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(CacheState::default()),
            store,
            clock,
            config,
            tickets: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        });

        let (loaded_tx, loaded) = watch::channel(false);
        let loader = shared.clone();
        tokio::spawn(async move {
            loader.merge_persisted().await;
            let _ = loaded_tx.send(true);
        });

        Self { shared, loaded }
    }

    /// Resolves once the startup snapshot merge has finished. Every mutating
    /// operation waits for it so an early write cannot replace the snapshot.
    pub async fn wait_until_loaded(&self) {
        let mut loaded = self.loaded.clone();
        let _ = loaded.wait_for(|done| *done).await;
    }

    /// Cached assets for `key`, fetching through `fetcher` when stale or missing
    pub async fn get(&self, key: &AssetCacheKey, fetcher: Arc<dyn AssetFetcher>) -> Vec<Asset> {
        self.wait_until_loaded().await;
        let raw = key.to_string();
        {
            let mut state = self.shared.state.lock().await;
            let now = self.shared.clock.now_millis();
            let cached = state
                .entries
                .get(&raw)
                .filter(|record| self.shared.is_fresh(record, now))
                .map(|record| record.assets.clone());

            if let Some(assets) = cached {
                debug!("Asset cache hit for {}", raw);
                self.shared.arm_refresh(&mut state, &raw, fetcher);
                return assets;
            }
        }

        debug!("Asset cache miss for {}", raw);
        self.shared.refresh_now(key, raw, fetcher).await
    }

    /// Drop the record for `key` and fetch it again regardless of freshness
    pub async fn force_refresh(
        &self,
        key: &AssetCacheKey,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Vec<Asset> {
        self.wait_until_loaded().await;
        let raw = key.to_string();
        self.shared.state.lock().await.remove(&raw);
        info!("Forcing asset refresh for {}", raw);

        self.shared.refresh_now(key, raw, fetcher).await
    }

    /// Mark the record stale so the next read refetches; its assets stay visible
    pub async fn invalidate_for_balance_change(&self, key: &AssetCacheKey) {
        self.wait_until_loaded().await;
        let raw = key.to_string();
        let mut state = self.shared.state.lock().await;
        if let Some(record) = state.entries.get_mut(&raw) {
            record.last_updated = 0;
            debug!("Invalidated asset cache entry {}", raw);
        }
    }

    /// Remove every entry of `address` from memory and from the snapshot
    pub async fn clear_for_address(&self, address: &str) {
        self.wait_until_loaded().await;
        let removed = {
            let mut state = self.shared.state.lock().await;
            let keys: Vec<String> = state
                .entries
                .keys()
                .filter(|key| AssetCacheKey::belongs_to(key, address))
                .cloned()
                .collect();
            for key in &keys {
                state.remove(key);
            }
            keys.len()
        };
        info!("Cleared {} asset cache entries for {}", removed, address);

        self.shared.store.clear_for_address(address).await;
    }

    /// Empty memory and cancel every pending refresh. The snapshot is left alone.
    pub async fn clear_all(&self) {
        self.wait_until_loaded().await;
        let mut state = self.shared.state.lock().await;
        let cleared = state.entries.len();
        state.entries.clear();
        state.applied.clear();
        let cancelled = state.timers.cancel_all();
        info!(
            "Cleared {} asset cache entries, cancelled {} refreshes",
            cleared, cancelled
        );
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.shared.state.lock().await;
        let addresses: BTreeSet<&str> = state
            .entries
            .values()
            .map(|record| record.address.as_str())
            .collect();
        let timestamps = state.entries.values().map(|record| record.last_updated);

        CacheStats {
            size: state.entries.len(),
            max_size: self.shared.config.max_entries,
            addresses: addresses.into_iter().map(str::to_string).collect(),
            oldest_entry: timestamps.clone().min(),
            newest_entry: timestamps.max(),
        }
    }

    /// The record for `key` without any refresh side effects
    pub async fn peek(&self, key: &AssetCacheKey) -> Option<CachedAssets> {
        let raw = key.to_string();
        self.shared.state.lock().await.entries.get(&raw).cloned()
    }

    /// Whether a background refresh is armed for `key`
    pub async fn is_refresh_pending(&self, key: &AssetCacheKey) -> bool {
        let raw = key.to_string();
        self.shared.state.lock().await.timers.is_armed(&raw)
    }

    /// Number of background refreshes currently armed
    pub async fn pending_refreshes(&self) -> usize {
        self.shared.state.lock().await.timers.len()
    }

    /// The persisted tier
    pub fn store(&self) -> &SnapshotStore {
        &self.shared.store
    }
}

impl Drop for AssetCacheManager {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}
