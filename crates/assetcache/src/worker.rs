//! Background loader threads
//!
//! Each worker blocks on the load queue and completes requests until the
//! queue is closed and empty.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use assetcore::{Error, Result};
use tracing::{debug, info};

use crate::manager::Shared;

pub(crate) fn spawn(shared: Arc<Shared>, index: usize) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("asset-loader-{}", index))
        .spawn(move || run(shared, index))
        .map_err(|e| Error::Configuration(format!("failed to spawn loader thread: {}", e)))
}

fn run(shared: Arc<Shared>, index: usize) {
    info!("Asset loader {} started", index);

    let mut completed = 0u64;
    while let Some(request) = shared.pending().dequeue() {
        shared.complete(request);
        completed += 1;
        debug!(worker = index, completed, "load request finished");
    }

    info!("Asset loader {} stopped after {} loads", index, completed);
}
