//! AssetManager: bounded shared asset cache

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use ahash::RandomState;
use assetcore::{Asset, AssetId, AssetSource, Error, Result};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{CacheConfig, LoadMode};
use crate::queue::{LoadQueue, Priority};
use crate::stats::{CacheStats, Event};
use crate::strategy::EvictionStrategy;
use crate::ticket::{LoadTicket, PendingAsset};
use crate::worker;

/// Pending load: a fresh unloaded asset and the ticket its requesters wait on
pub(crate) struct LoadRequest {
    asset: Arc<Asset>,
    ticket: Arc<LoadTicket>,
}

/// Everything guarded by the cache lock
struct CacheState {
    /// Authoritative resident set
    resident: HashMap<AssetId, Arc<Asset>, RandomState>,

    /// Ordering of the resident set
    strategy: Box<dyn EvictionStrategy>,

    /// Loads that have been requested but not yet admitted or failed
    inflight: HashMap<AssetId, Arc<LoadTicket>, RandomState>,
}

impl CacheState {
    /// Hand an asset to the strategy and mirror any eviction in `resident`
    fn admit(&mut self, asset: Arc<Asset>, stats: &CacheStats) {
        if let Some(evicted) = self.strategy.admit(Arc::clone(&asset)) {
            self.resident.remove(&evicted);
            stats.record(Event::Eviction);
            debug!(id = %evicted, "evicted to make room for {}", asset.id());
        }
        self.resident.insert(asset.id().clone(), asset);
        debug_assert_eq!(self.resident.len(), self.strategy.len());
    }
}

/// State shared between the manager and its loader threads
pub(crate) struct Shared {
    config: CacheConfig,
    source: Arc<dyn AssetSource>,
    state: Mutex<CacheState>,
    pending: LoadQueue<LoadRequest>,
    stats: CacheStats,
    shut_down: AtomicBool,
}

impl Shared {
    pub(crate) fn pending(&self) -> &LoadQueue<LoadRequest> {
        &self.pending
    }

    /// Finish one load request: fetch, admit, wake requesters
    pub(crate) fn complete(&self, request: LoadRequest) {
        let LoadRequest { asset, ticket } = request;
        let loaded = asset.load(self.source.as_ref());

        let mut state = self.state.lock();
        state.inflight.remove(asset.id());
        let outcome = match loaded {
            Ok(()) => {
                state.admit(Arc::clone(&asset), &self.stats);
                self.stats.record(Event::Admission);
                Ok(asset)
            }
            Err(err) => {
                self.stats.record(Event::LoadFailure);
                Err(err)
            }
        };
        drop(state);

        ticket.complete(outcome);
    }

    /// Give up on a request that never reached the queue
    fn abandon(&self, id: &AssetId, ticket: &LoadTicket, err: Error) -> Error {
        self.state.lock().inflight.remove(id);
        if matches!(err, Error::LoadFailure { .. }) {
            self.stats.record(Event::LoadFailure);
        }
        ticket.complete(Err(err.clone()));
        err
    }

    fn drain_pending(&self) -> usize {
        let mut processed = 0;
        while let Some(request) = self.pending.try_dequeue() {
            self.complete(request);
            processed += 1;
        }
        processed
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

/// Bounded in-memory cache of assets shared by concurrent requesters
///
/// Construct one per process and pass it around (usually in an `Arc`).
/// Dropping the manager shuts down its loader threads.
pub struct AssetManager {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AssetManager {
    /// Create a manager using the strategy named by `config.policy`
    ///
    /// # Arguments
    /// * `config` - Capacity, policy and operating mode
    /// * `source` - Where assets are fetched from
    ///
    /// # Returns
    /// * `Result<AssetManager>` - Ready manager, with loader threads running
    ///   in asynchronous mode
    pub fn new(config: CacheConfig, source: Arc<dyn AssetSource>) -> Result<Self> {
        config.validate()?;
        let strategy = config.policy.build(config.capacity);
        Self::with_strategy(config, strategy, source)
    }

    /// Create a manager with an explicit strategy
    ///
    /// The strategy's own capacity bounds the resident set.
    pub fn with_strategy(
        config: CacheConfig,
        strategy: Box<dyn EvictionStrategy>,
        source: Arc<dyn AssetSource>,
    ) -> Result<Self> {
        config.validate()?;
        if !strategy.is_empty() {
            return Err(Error::Configuration(
                "initial strategy must not track any assets".to_string(),
            ));
        }

        info!(
            "Asset manager starting: policy={} capacity={} mode={} workers={}",
            strategy.name(),
            strategy.capacity(),
            config.mode.as_str(),
            config.workers
        );

        let spawn_workers = match config.mode {
            LoadMode::Synchronous => 0,
            LoadMode::Asynchronous => config.workers,
        };

        let shared = Arc::new(Shared {
            config,
            source,
            state: Mutex::new(CacheState {
                resident: HashMap::with_hasher(RandomState::new()),
                strategy,
                inflight: HashMap::with_hasher(RandomState::new()),
            }),
            pending: LoadQueue::new(),
            stats: CacheStats::new(),
            shut_down: AtomicBool::new(false),
        });

        let manager = Self {
            shared: Arc::clone(&shared),
            workers: Mutex::new(Vec::with_capacity(spawn_workers)),
        };
        for index in 0..spawn_workers {
            let handle = worker::spawn(Arc::clone(&shared), index)?;
            manager.workers.lock().push(handle);
        }

        Ok(manager)
    }

    /// Get an asset, loading it on a miss
    ///
    /// Blocks until the asset is loaded. In asynchronous mode with no
    /// workers this waits for another thread to call `update()`.
    pub fn request_asset(&self, id: &str) -> Result<Arc<Asset>> {
        self.request_asset_with_priority(id, self.shared.config.default_priority)
    }

    /// Get an asset, queueing a miss at `priority`
    pub fn request_asset_with_priority(&self, id: &str, priority: Priority) -> Result<Arc<Asset>> {
        let pending = self.submit(id, priority)?;
        match self.shared.config.timeout() {
            Some(timeout) => pending.wait_timeout(timeout),
            None => pending.wait(),
        }
    }

    /// Request an asset without waiting for it
    ///
    /// Hits return a completed handle. Misses for an ID already being loaded
    /// join that load instead of starting another.
    pub fn submit(&self, id: &str, priority: Priority) -> Result<PendingAsset> {
        let shared = &self.shared;

        let (id, ticket) = {
            let mut state = shared.state.lock();
            if let Some(asset) = state.resident.get(id).cloned() {
                if asset.is_loaded() {
                    state.admit(Arc::clone(&asset), &shared.stats);
                    shared.stats.record(Event::Hit);
                    debug!(id, "cache hit");
                    return Ok(PendingAsset::ready(asset));
                }
                // Unloaded through a caller's handle; reload it
                warn!(id, status = %asset.status(), "dropping stale resident entry");
                state.resident.remove(id);
                state.strategy.remove(asset.id());
            }

            shared.stats.record(Event::Miss);
            if let Some(ticket) = state.inflight.get(id) {
                debug!(id, "joining in-flight load");
                return Ok(PendingAsset::new(Arc::clone(ticket)));
            }
            if shared.is_shut_down() {
                return Err(Error::ShutDown);
            }

            let id = AssetId::from(id);
            let ticket = LoadTicket::new(id.clone());
            state.inflight.insert(id.clone(), Arc::clone(&ticket));
            (id, ticket)
        };
        debug!(id = %id, priority, "cache miss");

        let described = panic::catch_unwind(AssertUnwindSafe(|| shared.source.describe(&id)))
            .unwrap_or_else(|_| Err(Error::load_failure(&id, "source panicked while resolving")));
        let descriptor = match described {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(id = %id, "cannot resolve asset: {}", err);
                let err = match err {
                    Error::LoadFailure { .. } => err,
                    other => Error::load_failure(&id, other),
                };
                return Err(shared.abandon(&id, &ticket, err));
            }
        };

        let request = LoadRequest {
            asset: Arc::new(Asset::new(descriptor)),
            ticket: Arc::clone(&ticket),
        };
        {
            // Shutdown flips under this lock, so nothing is queued after the
            // final drain.
            let _state = shared.state.lock();
            if shared.is_shut_down() {
                drop(_state);
                return Err(shared.abandon(&id, &ticket, Error::ShutDown));
            }
            shared.pending.enqueue(request, priority);
        }

        if shared.config.mode == LoadMode::Synchronous {
            // Loads the highest priority request, which need not be ours;
            // every enqueue is paired with one completion so ours still runs.
            if let Some(request) = shared.pending.try_dequeue() {
                shared.complete(request);
            }
        }

        Ok(PendingAsset::new(ticket))
    }

    /// Drop an asset from the cache and unload it
    ///
    /// Releasing an ID that is not resident is a no-op. Exactly the requested
    /// ID is removed; no other asset is evicted.
    pub fn release_asset(&self, id: &str) {
        let mut state = self.shared.state.lock();
        let Some(asset) = state.resident.remove(id) else {
            debug!(id, "release of non-resident asset ignored");
            return;
        };
        state.strategy.remove(asset.id());

        if let Err(err) = asset.unload() {
            error!(id, "released asset was not loaded: {}", err);
        }
        self.shared.stats.record(Event::Release);
        debug!(id, "released");
    }

    /// Replace the eviction strategy
    ///
    /// Only allowed while nothing is resident; otherwise fails with
    /// `Configuration` and leaves the current strategy in place.
    pub fn set_strategy(&self, strategy: Box<dyn EvictionStrategy>) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !state.resident.is_empty() {
            return Err(Error::Configuration(format!(
                "cannot replace the eviction strategy while {} assets are resident",
                state.resident.len()
            )));
        }
        if !strategy.is_empty() {
            return Err(Error::Configuration(
                "replacement strategy must not track any assets".to_string(),
            ));
        }

        info!(
            "Eviction strategy replaced: {} -> {} (capacity {})",
            state.strategy.name(),
            strategy.name(),
            strategy.capacity()
        );
        state.strategy = strategy;
        Ok(())
    }

    /// Complete every queued load on the calling thread
    ///
    /// # Returns
    /// * `usize` - Number of requests processed
    pub fn update(&self) -> usize {
        self.shared.drain_pending()
    }

    /// Stop accepting misses, finish queued loads and join loader threads
    ///
    /// Hits are still served afterwards. Calling this twice is harmless.
    pub fn shutdown(&self) {
        {
            let _state = self.shared.state.lock();
            if self.shared.shut_down.swap(true, Ordering::AcqRel) {
                return;
            }
        }
        self.shared.pending.close();

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                error!("asset loader thread panicked");
            }
        }

        let leftover = self.shared.drain_pending();
        info!("Asset manager shut down ({} loads finished during shutdown)", leftover);
    }

    /// Whether `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }

    /// Check if `id` is resident, without touching recency
    pub fn is_resident(&self, id: &str) -> bool {
        self.shared.state.lock().resident.contains_key(id)
    }

    /// Resident IDs, next eviction victim first
    pub fn resident_ids(&self) -> Vec<AssetId> {
        self.shared.state.lock().strategy.victims()
    }

    /// Number of resident assets
    pub fn len(&self) -> usize {
        self.shared.state.lock().resident.len()
    }

    /// Check if nothing is resident
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the active strategy
    pub fn capacity(&self) -> usize {
        self.shared.state.lock().strategy.capacity()
    }

    /// Name of the active strategy
    pub fn strategy_name(&self) -> &'static str {
        self.shared.state.lock().strategy.name()
    }

    /// Number of queued load requests
    pub fn pending_len(&self) -> usize {
        self.shared.pending.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.shared.stats
    }

    /// Get the configuration the manager was built with
    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
