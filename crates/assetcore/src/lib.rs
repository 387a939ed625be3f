//! # assetcore
//!
//! Asset entity and the sources assets are loaded from.
//!
//! ## Contents
//! - **Asset**: identity, size and the `Unloaded -> Loading -> Loaded` lifecycle
//! - **AssetSource**: the external fetch, with filesystem and in-memory backends
//! - **Error**: the error taxonomy shared with the cache layer

#![warn(missing_docs)]

mod asset;
mod error;
mod source;

pub use asset::{Asset, AssetDescriptor, AssetId, AssetKind, AssetStatus};
pub use error::{Error, Result};
pub use source::{AssetSource, FsSource, MemorySource};
