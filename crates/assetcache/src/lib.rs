//! # assetcache
//!
//! Bounded in-memory asset cache shared by concurrent requesters.
//!
//! ## Architecture
//! - **AssetManager**: resident map and eviction strategy behind one lock
//! - **EvictionStrategy**: pluggable policy (LRU, FIFO) with O(1) admit/evict
//! - **LoadQueue**: priority-ordered pending loads, FIFO among equal priorities
//! - **Workers**: background threads draining the queue in asynchronous mode
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use assetcache::{AssetManager, CacheConfig, MemorySource};
//!
//! let source = Arc::new(MemorySource::new());
//! source.insert("hero.png", &b"pixels"[..]);
//!
//! let manager = AssetManager::new(CacheConfig::with_capacity(16), source).unwrap();
//! let hero = manager.request_asset("hero.png").unwrap();
//! assert!(hero.is_loaded());
//! manager.release_asset("hero.png");
//! ```

#![warn(missing_docs)]

mod config;
mod lru;
mod manager;
mod queue;
mod stats;
mod strategy;
mod ticket;
mod worker;

pub use assetcore::{
    Asset, AssetDescriptor, AssetId, AssetKind, AssetSource, AssetStatus, Error, FsSource,
    MemorySource, Result,
};
pub use config::{CacheConfig, EvictionPolicy, LoadMode, ParseConfigError};
pub use manager::AssetManager;
pub use queue::{LoadQueue, Priority};
pub use stats::{CacheStats, StatsSnapshot};
pub use strategy::{EvictionStrategy, FifoStrategy, LruStrategy};
pub use ticket::PendingAsset;
