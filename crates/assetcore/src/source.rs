//! Backing sources assets are fetched from
//!
//! A source answers two questions: what an ID refers to (`describe`) and what
//! its bytes are (`fetch`). Decoding the bytes into something usable is left
//! to the host application.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::asset::{AssetDescriptor, AssetId, AssetKind};
use crate::error::{Error, Result};

/// External collaborator performing the potentially slow fetch
pub trait AssetSource: Send + Sync + 'static {
    /// Resolve an ID into a descriptor without fetching the payload
    fn describe(&self, id: &AssetId) -> Result<AssetDescriptor>;

    /// Fetch the payload for a previously described asset
    fn fetch(&self, descriptor: &AssetDescriptor) -> Result<Bytes>;
}

/// Source reading assets from files under a root directory
///
/// IDs are relative paths. IDs that would escape the root are rejected.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Create a source rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, id: &AssetId) -> Result<PathBuf> {
        let relative = Path::new(id.as_str());
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if id.as_str().is_empty() || !contained {
            return Err(Error::load_failure(id, "id is not a path inside the source root"));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetSource for FsSource {
    fn describe(&self, id: &AssetId) -> Result<AssetDescriptor> {
        let path = self.resolve(id)?;
        let meta = std::fs::metadata(&path).map_err(|e| Error::load_failure(id, e))?;
        if !meta.is_file() {
            return Err(Error::load_failure(id, "not a regular file"));
        }

        Ok(AssetDescriptor {
            id: id.clone(),
            kind: AssetKind::from_path(&path),
            locator: path.to_string_lossy().into_owned(),
            size: meta.len(),
        })
    }

    fn fetch(&self, descriptor: &AssetDescriptor) -> Result<Bytes> {
        std::fs::read(&descriptor.locator)
            .map(Bytes::from)
            .map_err(|e| Error::load_failure(&descriptor.id, e))
    }
}

/// In-memory source
///
/// Counts fetches and can simulate a slow backend, which makes it handy for
/// tests and benchmarks.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: RwLock<HashMap<AssetId, Bytes>>,
    fetches: AtomicU64,
    latency: Option<Duration>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` on every fetch
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add or replace an entry
    pub fn insert(&self, id: impl Into<AssetId>, data: impl Into<Bytes>) {
        self.entries.write().insert(id.into(), data.into());
    }

    /// Remove an entry
    pub fn remove(&self, id: &str) -> Option<Bytes> {
        self.entries.write().remove(id)
    }

    /// Number of successful fetches so far
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the source holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl AssetSource for MemorySource {
    fn describe(&self, id: &AssetId) -> Result<AssetDescriptor> {
        let entries = self.entries.read();
        let data = entries
            .get(id)
            .ok_or_else(|| Error::load_failure(id, "no such entry"))?;

        Ok(AssetDescriptor {
            id: id.clone(),
            kind: AssetKind::from_path(id.as_str()),
            locator: format!("memory://{}", id),
            size: data.len() as u64,
        })
    }

    fn fetch(&self, descriptor: &AssetDescriptor) -> Result<Bytes> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }

        let data = self
            .entries
            .read()
            .get(&descriptor.id)
            .cloned()
            .ok_or_else(|| Error::load_failure(&descriptor.id, "no such entry"))?;
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Ok(data)
    }
}
