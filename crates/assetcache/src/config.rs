//! Cache configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use assetcore::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::queue::Priority;
use crate::strategy::{EvictionStrategy, FifoStrategy, LruStrategy};

/// Error type for parsing configuration enums
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConfigError(String);

impl fmt::Display for ParseConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration value: {}", self.0)
    }
}

impl std::error::Error for ParseConfigError {}

/// Which eviction strategy a manager starts with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least Recently Used
    #[default]
    Lru,
    /// First In First Out
    Fifo,
}

impl EvictionPolicy {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Fifo => "fifo",
        }
    }

    /// Construct a strategy of this policy
    pub fn build(&self, capacity: usize) -> Box<dyn EvictionStrategy> {
        match self {
            EvictionPolicy::Lru => Box::new(LruStrategy::new(capacity)),
            EvictionPolicy::Fifo => Box::new(FifoStrategy::new(capacity)),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "fifo" => Ok(EvictionPolicy::Fifo),
            _ => Err(ParseConfigError(s.to_string())),
        }
    }
}

/// Where loads run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// The requesting thread performs the load before returning
    #[default]
    Synchronous,
    /// Requests are queued and completed by background workers or `update()`
    Asynchronous,
}

impl LoadMode {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMode::Synchronous => "synchronous",
            LoadMode::Asynchronous => "asynchronous",
        }
    }
}

impl FromStr for LoadMode {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sync" | "synchronous" => Ok(LoadMode::Synchronous),
            "async" | "asynchronous" => Ok(LoadMode::Asynchronous),
            _ => Err(ParseConfigError(s.to_string())),
        }
    }
}

/// Asset manager configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of resident assets
    pub capacity: usize,
    /// Initial eviction policy
    pub policy: EvictionPolicy,
    /// Operating mode
    pub mode: LoadMode,
    /// Background worker threads in asynchronous mode; 0 means the host
    /// drives loading by calling `update()`
    pub workers: usize,
    /// Priority used by `request_asset`
    pub default_priority: Priority,
    /// Upper bound on how long `request_asset` waits for a load
    pub load_timeout_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            policy: EvictionPolicy::default(),
            mode: LoadMode::default(),
            workers: 1,
            default_priority: 100,
            load_timeout_ms: None,
        }
    }
}

impl CacheConfig {
    /// Default configuration with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Set the eviction policy
    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the operating mode
    pub fn mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the number of background workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the default request priority
    pub fn default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    /// Bound blocking waits
    ///
    /// Rounded up to whole milliseconds, never below one.
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        let ms = timeout.as_nanos().div_ceil(1_000_000).max(1);
        self.load_timeout_ms = Some(u64::try_from(ms).unwrap_or(u64::MAX));
        self
    }

    /// Configured wait bound, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Configuration(
                "capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
