//! Asset entity and its load/unload lifecycle
//!
//! Status moves `Unloaded -> Loading -> Loaded` on load and back to
//! `Unloaded` on unload. A failed fetch drops straight back to `Unloaded`
//! without keeping any partial payload.

use std::borrow::Borrow;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::source::AssetSource;

/// Stable, unique identifier of an asset
///
/// Cloning is cheap: the underlying string is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(Arc<str>);

impl AssetId {
    /// Create an identifier from any string-like value
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// View the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl Borrow<str> for AssetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Category tag of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Images and texture containers
    Texture,
    /// Geometry
    Mesh,
    /// Sound clips and streams
    Audio,
    /// Shader sources
    Shader,
    /// Anything else
    Data,
}

impl AssetKind {
    /// Guess the kind from a path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png" | "jpg" | "jpeg" | "ktx2" | "dds") => AssetKind::Texture,
            Some("obj" | "gltf" | "glb") => AssetKind::Mesh,
            Some("wav" | "ogg" | "mp3" | "flac") => AssetKind::Audio,
            Some("wgsl" | "glsl" | "spv") => AssetKind::Shader,
            _ => AssetKind::Data,
        }
    }

    /// Lowercase name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Texture => "texture",
            AssetKind::Mesh => "mesh",
            AssetKind::Audio => "audio",
            AssetKind::Shader => "shader",
            AssetKind::Data => "data",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetStatus {
    /// No payload held
    Unloaded,
    /// Fetch in progress
    Loading,
    /// Payload resident in memory
    Loaded,
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetStatus::Unloaded => "unloaded",
            AssetStatus::Loading => "loading",
            AssetStatus::Loaded => "loaded",
        };
        f.write_str(name)
    }
}

/// Everything known about an asset before it is loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Identifier
    pub id: AssetId,
    /// Category tag
    pub kind: AssetKind,
    /// Opaque path or URI, only meaningful to the source that produced it
    pub locator: String,
    /// Size in bytes (or cost units)
    pub size: u64,
}

struct AssetState {
    status: AssetStatus,
    payload: Option<Bytes>,
}

/// One cacheable resource
///
/// Assets are shared as `Arc<Asset>`. A handle held outside the cache is a
/// view that goes stale once the cache unloads the asset: its status flips to
/// `Unloaded` and its payload is released.
pub struct Asset {
    descriptor: AssetDescriptor,
    state: Mutex<AssetState>,
}

impl Asset {
    /// Create an unloaded asset
    pub fn new(descriptor: AssetDescriptor) -> Self {
        Self {
            descriptor,
            state: Mutex::new(AssetState {
                status: AssetStatus::Unloaded,
                payload: None,
            }),
        }
    }

    /// Identifier
    pub fn id(&self) -> &AssetId {
        &self.descriptor.id
    }

    /// Category tag
    pub fn kind(&self) -> AssetKind {
        self.descriptor.kind
    }

    /// Locator used by the loading step
    pub fn locator(&self) -> &str {
        &self.descriptor.locator
    }

    /// Recorded size, stable for the lifetime of the asset
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Full descriptor
    pub fn descriptor(&self) -> &AssetDescriptor {
        &self.descriptor
    }

    /// Current lifecycle status
    pub fn status(&self) -> AssetStatus {
        self.state.lock().status
    }

    /// Shorthand for `status() == Loaded`
    pub fn is_loaded(&self) -> bool {
        self.status() == AssetStatus::Loaded
    }

    /// Loaded payload, if any
    pub fn payload(&self) -> Option<Bytes> {
        self.state.lock().payload.clone()
    }

    /// Fetch the payload from `source`
    ///
    /// Only valid while `Unloaded`. The state lock is not held during the
    /// fetch, so readers observe `Loading` meanwhile. A source that panics is
    /// reported as `LoadFailure` and leaves the asset `Unloaded`.
    pub fn load(&self, source: &dyn AssetSource) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.status != AssetStatus::Unloaded {
                return Err(Error::InvalidTransition {
                    id: self.id().clone(),
                    action: "load",
                    status: state.status,
                });
            }
            state.status = AssetStatus::Loading;
        }

        let fetched = panic::catch_unwind(AssertUnwindSafe(|| source.fetch(&self.descriptor)))
            .unwrap_or_else(|cause| {
                Err(Error::load_failure(
                    self.id(),
                    format!("source panicked: {}", panic_message(cause.as_ref())),
                ))
            });

        let mut state = self.state.lock();
        match fetched {
            Ok(payload) => {
                state.status = AssetStatus::Loaded;
                state.payload = Some(payload);
                debug!(id = %self.id(), size = self.size(), "asset loaded");
                Ok(())
            }
            Err(err) => {
                state.status = AssetStatus::Unloaded;
                state.payload = None;
                warn!(id = %self.id(), "asset load failed: {}", err);
                match err {
                    Error::LoadFailure { .. } => Err(err),
                    other => Err(Error::load_failure(self.id(), other)),
                }
            }
        }
    }

    /// Release the payload
    ///
    /// Calling this on an asset that is not `Loaded` is a programming error
    /// and reported as `InvalidTransition`.
    pub fn unload(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.status != AssetStatus::Loaded {
            return Err(Error::InvalidTransition {
                id: self.id().clone(),
                action: "unload",
                status: state.status,
            });
        }
        state.status = AssetStatus::Unloaded;
        state.payload = None;
        debug!(id = %self.id(), "asset unloaded");
        Ok(())
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(msg) = cause.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = cause.downcast_ref::<String>() {
        msg
    } else {
        "unknown cause"
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("id", self.id())
            .field("kind", &self.kind())
            .field("size", &self.size())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn descriptor(id: &str, size: u64) -> AssetDescriptor {
        AssetDescriptor {
            id: AssetId::from(id),
            kind: AssetKind::from_path(id),
            locator: format!("memory://{}", id),
            size,
        }
    }

    #[test]
    fn test_load_unload_cycle() {
        let source = MemorySource::new();
        source.insert("hero.png", &b"pixels"[..]);

        let asset = Asset::new(descriptor("hero.png", 6));
        assert_eq!(asset.status(), AssetStatus::Unloaded);
        assert!(asset.payload().is_none());

        asset.load(&source).unwrap();
        assert_eq!(asset.status(), AssetStatus::Loaded);
        assert_eq!(asset.payload().unwrap(), Bytes::from_static(b"pixels"));

        asset.unload().unwrap();
        assert_eq!(asset.status(), AssetStatus::Unloaded);
        assert!(asset.payload().is_none());

        // A fresh cycle is allowed
        asset.load(&source).unwrap();
        assert!(asset.is_loaded());
    }

    #[test]
    fn test_failed_load_stays_unloaded() {
        let source = MemorySource::new();
        let asset = Asset::new(descriptor("missing.obj", 0));

        let err = asset.load(&source).unwrap_err();
        assert!(matches!(err, Error::LoadFailure { .. }));
        assert_eq!(asset.status(), AssetStatus::Unloaded);
        assert!(asset.payload().is_none());
    }

    #[test]
    fn test_unload_requires_loaded() {
        let asset = Asset::new(descriptor("a.wav", 1));
        let err = asset.unload().unwrap_err();
        assert_eq!(
            err,
            Error::InvalidTransition {
                id: AssetId::from("a.wav"),
                action: "unload",
                status: AssetStatus::Unloaded,
            }
        );
    }

    #[test]
    fn test_double_load_rejected() {
        let source = MemorySource::new();
        source.insert("a.wgsl", &b"fn main() {}"[..]);
        let asset = Asset::new(descriptor("a.wgsl", 12));

        asset.load(&source).unwrap();
        let err = asset.load(&source).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { action: "load", .. }));
        assert!(asset.is_loaded());
    }

    struct Panicking;

    impl AssetSource for Panicking {
        fn describe(&self, id: &AssetId) -> Result<AssetDescriptor> {
            Ok(descriptor(id.as_str(), 1))
        }

        fn fetch(&self, descriptor: &AssetDescriptor) -> Result<Bytes> {
            panic!("disk on fire: {}", descriptor.id)
        }
    }

    #[test]
    fn test_panicking_source_is_load_failure() {
        let asset = Asset::new(descriptor("boom.bin", 1));

        let err = asset.load(&Panicking).unwrap_err();
        match err {
            Error::LoadFailure { id, reason } => {
                assert_eq!(id, AssetId::from("boom.bin"));
                assert!(reason.contains("disk on fire: boom.bin"), "{}", reason);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(asset.status(), AssetStatus::Unloaded);

        // The asset is usable again afterwards
        let source = MemorySource::new();
        source.insert("boom.bin", &b"x"[..]);
        asset.load(&source).unwrap();
        assert!(asset.is_loaded());
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(AssetKind::from_path("a/b/c.PNG"), AssetKind::Texture);
        assert_eq!(AssetKind::from_path("model.glb"), AssetKind::Mesh);
        assert_eq!(AssetKind::from_path("music.ogg"), AssetKind::Audio);
        assert_eq!(AssetKind::from_path("lit.wgsl"), AssetKind::Shader);
        assert_eq!(AssetKind::from_path("level.bin"), AssetKind::Data);
        assert_eq!(AssetKind::from_path("noext"), AssetKind::Data);
    }

    #[test]
    fn test_size_is_recorded() {
        let asset = Asset::new(descriptor("x.bin", 4096));
        assert_eq!(asset.size(), 4096);
        assert_eq!(asset.kind(), AssetKind::Data);
        assert_eq!(asset.locator(), "memory://x.bin");
    }
}
