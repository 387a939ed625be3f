//! Eviction strategies
//!
//! A strategy tracks which assets are resident and decides which one leaves
//! when room is needed. It does not own asset data beyond a shared handle used
//! to unload the victim.

use std::sync::Arc;

use assetcore::{Asset, AssetId, Error, Result};
use tracing::{debug, error};

use crate::lru::LruList;

/// Contract every eviction policy implements
pub trait EvictionStrategy: Send {
    /// Short policy name used in logs
    fn name(&self) -> &'static str;

    /// Maximum number of resident assets
    fn capacity(&self) -> usize;

    /// Number of resident assets
    fn len(&self) -> usize;

    /// Check if nothing is resident
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check membership without affecting the order
    fn contains(&self, id: &AssetId) -> bool;

    /// Insert a loaded asset, or record a hit if it is already resident
    ///
    /// When the resident set is full the next victim is evicted first and
    /// its ID returned.
    fn admit(&mut self, asset: Arc<Asset>) -> Option<AssetId>;

    /// Evict the next victim, unloading it
    ///
    /// Fails with `EmptyCache` when nothing is resident.
    fn evict(&mut self) -> Result<AssetId>;

    /// Drop `id` from the resident set without unloading it
    fn remove(&mut self, id: &AssetId) -> Option<Arc<Asset>>;

    /// Resident IDs, next victim first
    fn victims(&self) -> Vec<AssetId>;
}

fn unload_victim(policy: &str, id: &AssetId, asset: &Asset) {
    // Only loaded assets are admitted, so this only fails if someone
    // unloaded a resident asset behind the cache's back.
    if let Err(err) = asset.unload() {
        error!(policy, id = %id, "evicted asset was not loaded: {}", err);
    }
    debug!(policy, id = %id, "evicted");
}

/// Least-recently-used eviction
pub struct LruStrategy {
    entries: LruList<AssetId, Arc<Asset>>,
    capacity: usize,
}

impl LruStrategy {
    /// Create a strategy holding at most `capacity` assets
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            entries: LruList::with_capacity(capacity),
            capacity,
        }
    }
}

impl EvictionStrategy for LruStrategy {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, id: &AssetId) -> bool {
        self.entries.contains(id)
    }

    fn admit(&mut self, asset: Arc<Asset>) -> Option<AssetId> {
        if self.entries.touch(asset.id()) {
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict().ok()
        } else {
            None
        };
        self.entries.insert(asset.id().clone(), asset);
        evicted
    }

    fn evict(&mut self) -> Result<AssetId> {
        let (id, asset) = self.entries.pop_lru().ok_or(Error::EmptyCache)?;
        unload_victim(self.name(), &id, &asset);
        Ok(id)
    }

    fn remove(&mut self, id: &AssetId) -> Option<Arc<Asset>> {
        self.entries.remove(id)
    }

    fn victims(&self) -> Vec<AssetId> {
        self.entries.keys_lru().cloned().collect()
    }
}

/// First-in-first-out eviction; hits do not change the order
pub struct FifoStrategy {
    entries: LruList<AssetId, Arc<Asset>>,
    capacity: usize,
}

impl FifoStrategy {
    /// Create a strategy holding at most `capacity` assets
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            entries: LruList::with_capacity(capacity),
            capacity,
        }
    }
}

impl EvictionStrategy for FifoStrategy {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, id: &AssetId) -> bool {
        self.entries.contains(id)
    }

    fn admit(&mut self, asset: Arc<Asset>) -> Option<AssetId> {
        if self.entries.contains(asset.id()) {
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict().ok()
        } else {
            None
        };
        self.entries.insert(asset.id().clone(), asset);
        evicted
    }

    fn evict(&mut self) -> Result<AssetId> {
        let (id, asset) = self.entries.pop_lru().ok_or(Error::EmptyCache)?;
        unload_victim(self.name(), &id, &asset);
        Ok(id)
    }

    fn remove(&mut self, id: &AssetId) -> Option<Arc<Asset>> {
        self.entries.remove(id)
    }

    fn victims(&self) -> Vec<AssetId> {
        self.entries.keys_lru().cloned().collect()
    }
}
