//! Error types for asset loading and cache management

use thiserror::Error;

use crate::asset::{AssetId, AssetStatus};

/// Result type alias for asset operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by assets, sources and the cache built on top of them
///
/// Only `LoadFailure`, `Configuration`, `Timeout` and `ShutDown` are expected
/// to reach application code. The other variants describe internal misuse and
/// are handled inside the cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The external fetch for an asset could not complete
    #[error("failed to load asset '{id}': {reason}")]
    LoadFailure {
        /// Asset that failed to load
        id: AssetId,
        /// Human readable cause
        reason: String,
    },

    /// A lifecycle method was called in a state that does not permit it
    #[error("cannot {action} asset '{id}' while it is {status}")]
    InvalidTransition {
        /// Asset whose lifecycle was violated
        id: AssetId,
        /// Operation that was attempted
        action: &'static str,
        /// Status observed at the time of the call
        status: AssetStatus,
    },

    /// Eviction requested with no resident entries
    #[error("eviction requested on an empty cache")]
    EmptyCache,

    /// Invalid configuration, or a strategy swap while assets are resident
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Waiting for a load took longer than the configured bound
    #[error("timed out waiting for asset '{id}'")]
    Timeout {
        /// Asset that was being waited on
        id: AssetId,
    },

    /// The cache no longer accepts load requests
    #[error("asset manager is shut down")]
    ShutDown,
}

impl Error {
    /// Build a `LoadFailure` for `id`
    pub fn load_failure(id: &AssetId, reason: impl ToString) -> Self {
        Error::LoadFailure {
            id: id.clone(),
            reason: reason.to_string(),
        }
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LoadFailure { .. } | Error::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = AssetId::from("textures/grass.png");
        let err = Error::load_failure(&id, "file not found");
        assert_eq!(
            err.to_string(),
            "failed to load asset 'textures/grass.png': file not found"
        );

        let err = Error::InvalidTransition {
            id,
            action: "unload",
            status: AssetStatus::Unloaded,
        };
        assert_eq!(
            err.to_string(),
            "cannot unload asset 'textures/grass.png' while it is unloaded"
        );
    }

    #[test]
    fn test_retryable() {
        let id = AssetId::from("a");
        assert!(Error::load_failure(&id, "io").is_retryable());
        assert!(Error::Timeout { id }.is_retryable());
        assert!(!Error::EmptyCache.is_retryable());
        assert!(!Error::Configuration("x".into()).is_retryable());
        assert!(!Error::ShutDown.is_retryable());
    }
}
