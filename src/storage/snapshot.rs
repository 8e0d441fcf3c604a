//! Persisted snapshot of the asset cache.
//!
//! The whole cache lives under a single storage key as
//! `{ "data": [[key, record], ...], "timestamp": <unix millis> }`.
//! Every failure is logged and swallowed here: persistence only speeds up
//! cold starts, the in-memory tier stays authoritative.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{StorageBackend, StorageError};
use crate::cache::keys::AssetCacheKey;
use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::models::{CachedAssets, SnapshotStats};

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    data: Vec<(String, CachedAssets)>,
    timestamp: i64,
}

/// Reads and writes the cache snapshot through a [`StorageBackend`]
pub struct SnapshotStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>, config: StoreConfig) -> Self {
        Self {
            backend,
            clock,
            config,
        }
    }

    fn max_age_millis(&self) -> i64 {
        i64::try_from(self.config.max_age.as_millis()).unwrap_or(i64::MAX)
    }

    async fn read(&self) -> Result<Option<Snapshot>, StorageError> {
        match self.backend.get(&self.config.storage_key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let value = serde_json::to_value(snapshot)?;
        self.backend.set(&self.config.storage_key, value).await
    }

    /// Overwrite the snapshot with `entries`, keeping only the most recently
    /// updated address groups
    pub async fn save(&self, entries: &HashMap<String, CachedAssets>) {
        let data = retain_recent_addresses(entries, self.config.max_addresses);
        let kept = data.len();
        let snapshot = Snapshot {
            data,
            timestamp: self.clock.now_millis(),
        };

        match self.write(&snapshot).await {
            Ok(()) => debug!(
                "Persisted {} of {} asset cache entries",
                kept,
                entries.len()
            ),
            Err(e) => warn!("Failed to persist asset cache: {}", e),
        }
    }

    /// Load the snapshot. Expired snapshots are deleted and reported as absent.
    pub async fn load(&self) -> Option<HashMap<String, CachedAssets>> {
        let snapshot = match self.read().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to load persisted asset cache: {}", e);
                return None;
            }
        };

        let age = self.clock.now_millis().saturating_sub(snapshot.timestamp);
        if age > self.max_age_millis() {
            info!("Discarding asset cache snapshot written {}ms ago", age);
            self.clear().await;
            return None;
        }

        debug!("Loaded {} asset cache entries from storage", snapshot.data.len());
        Some(snapshot.data.into_iter().collect())
    }

    /// Drop every entry of `address`, keeping the snapshot's original timestamp
    pub async fn clear_for_address(&self, address: &str) {
        let snapshot = match self.read().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to read asset cache snapshot for {}: {}", address, e);
                return;
            }
        };

        let before = snapshot.data.len();
        let data: Vec<_> = snapshot
            .data
            .into_iter()
            .filter(|(key, _)| !AssetCacheKey::belongs_to(key, address))
            .collect();
        let removed = before - data.len();

        let filtered = Snapshot {
            data,
            timestamp: snapshot.timestamp,
        };
        match self.write(&filtered).await {
            Ok(()) => debug!("Removed {} persisted entries for {}", removed, address),
            Err(e) => warn!("Failed to clear persisted entries for {}: {}", address, e),
        }
    }

    /// Remove the snapshot entirely
    pub async fn clear(&self) {
        if let Err(e) = self.backend.remove(&self.config.storage_key).await {
            warn!("Failed to clear asset cache snapshot: {}", e);
        }
    }

    pub async fn stats(&self) -> Option<SnapshotStats> {
        let snapshot = match self.read().await {
            Ok(snapshot) => snapshot?,
            Err(e) => {
                warn!("Failed to read asset cache snapshot stats: {}", e);
                return None;
            }
        };

        let addresses: HashSet<&str> = snapshot
            .data
            .iter()
            .map(|(key, record)| owner_of(key, record))
            .collect();
        let timestamps = snapshot.data.iter().map(|(_, record)| record.last_updated);

        Some(SnapshotStats {
            size: snapshot.data.len(),
            addresses: addresses.len(),
            oldest_entry: timestamps.clone().min(),
            newest_entry: timestamps.max(),
            age: self.clock.now_millis().saturating_sub(snapshot.timestamp),
        })
    }
}

/// Address a record belongs to; older records may only carry it inside the key
fn owner_of<'a>(key: &'a str, record: &'a CachedAssets) -> &'a str {
    if !record.address.is_empty() {
        return &record.address;
    }
    key.split(crate::cache::keys::KEY_SEPARATOR)
        .next()
        .unwrap_or(key)
}

/// Group entries by address, rank groups by their newest entry and keep the
/// top `max_addresses` groups
fn retain_recent_addresses(
    entries: &HashMap<String, CachedAssets>,
    max_addresses: usize,
) -> Vec<(String, CachedAssets)> {
    let mut groups: HashMap<&str, Vec<(&String, &CachedAssets)>> = HashMap::new();
    for (key, record) in entries {
        groups.entry(owner_of(key, record)).or_default().push((key, record));
    }

    let mut ranked: Vec<(&str, i64, Vec<(&String, &CachedAssets)>)> = groups
        .into_iter()
        .map(|(address, mut pairs)| {
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let newest = pairs.iter().map(|(_, r)| r.last_updated).max().unwrap_or(0);
            (address, newest, pairs)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    if ranked.len() > max_addresses {
        debug!(
            "Dropping {} address groups from the asset cache snapshot",
            ranked.len() - max_addresses
        );
    }

    ranked
        .into_iter()
        .take(max_addresses)
        .flat_map(|(_, _, pairs)| pairs)
        .map(|(key, record)| (key.clone(), record.clone()))
        .collect()
}
