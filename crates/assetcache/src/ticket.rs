//! Completion signal for in-flight loads
//!
//! One ticket exists per in-flight asset ID. Every requester that misses on
//! that ID while the load runs holds the same ticket and receives the same
//! outcome.

use std::sync::Arc;
use std::time::Duration;

use assetcore::{Asset, AssetId, Error, Result};
use parking_lot::{Condvar, Mutex};

pub(crate) struct LoadTicket {
    id: AssetId,
    outcome: Mutex<Option<Result<Arc<Asset>>>>,
    done: Condvar,
}

impl LoadTicket {
    pub(crate) fn new(id: AssetId) -> Arc<Self> {
        Arc::new(Self {
            id,
            outcome: Mutex::new(None),
            done: Condvar::new(),
        })
    }

    fn completed(outcome: Result<Arc<Asset>>, id: AssetId) -> Arc<Self> {
        Arc::new(Self {
            id,
            outcome: Mutex::new(Some(outcome)),
            done: Condvar::new(),
        })
    }

    /// Publish the outcome; later calls are ignored
    pub(crate) fn complete(&self, outcome: Result<Arc<Asset>>) {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            *slot = Some(outcome);
            self.done.notify_all();
        }
    }

    fn wait(&self) -> Result<Arc<Asset>> {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut slot);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> Result<Arc<Asset>> {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            self.done
                .wait_while_for(&mut slot, |slot| slot.is_none(), timeout);
        }
        match slot.as_ref() {
            Some(outcome) => outcome.clone(),
            None => Err(Error::Timeout {
                id: self.id.clone(),
            }),
        }
    }

    fn try_get(&self) -> Option<Result<Arc<Asset>>> {
        self.outcome.lock().clone()
    }
}

/// Handle to an asset that may still be loading
///
/// Returned by `AssetManager::submit`. Cache hits produce a handle that is
/// already complete.
pub struct PendingAsset {
    ticket: Arc<LoadTicket>,
}

impl PendingAsset {
    pub(crate) fn new(ticket: Arc<LoadTicket>) -> Self {
        Self { ticket }
    }

    pub(crate) fn ready(asset: Arc<Asset>) -> Self {
        let id = asset.id().clone();
        Self::new(LoadTicket::completed(Ok(asset), id))
    }

    /// Requested ID
    pub fn id(&self) -> &AssetId {
        &self.ticket.id
    }

    /// Check if the load has finished, successfully or not
    pub fn is_ready(&self) -> bool {
        self.ticket.outcome.lock().is_some()
    }

    /// Outcome if the load has finished
    pub fn try_get(&self) -> Option<Result<Arc<Asset>>> {
        self.ticket.try_get()
    }

    /// Block until the load finishes
    pub fn wait(&self) -> Result<Arc<Asset>> {
        self.ticket.wait()
    }

    /// Block until the load finishes or `timeout` elapses
    ///
    /// Timing out does not cancel the load.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Arc<Asset>> {
        self.ticket.wait_timeout(timeout)
    }
}

impl std::fmt::Debug for PendingAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAsset")
            .field("id", self.id())
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetcore::{AssetDescriptor, AssetKind};
    use std::thread;

    fn asset(id: &str) -> Arc<Asset> {
        Arc::new(Asset::new(AssetDescriptor {
            id: AssetId::from(id),
            kind: AssetKind::Data,
            locator: id.to_string(),
            size: 0,
        }))
    }

    #[test]
    fn test_ready_handle() {
        let pending = PendingAsset::ready(asset("a"));
        assert!(pending.is_ready());
        assert_eq!(pending.id().as_str(), "a");
        assert_eq!(pending.wait().unwrap().id().as_str(), "a");
    }

    #[test]
    fn test_waiters_share_outcome() {
        let ticket = LoadTicket::new(AssetId::from("shared"));
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let pending = PendingAsset::new(Arc::clone(&ticket));
                thread::spawn(move || pending.wait())
            })
            .collect();

        let loaded = asset("shared");
        ticket.complete(Ok(Arc::clone(&loaded)));

        for waiter in waiters {
            let got = waiter.join().unwrap().unwrap();
            assert!(Arc::ptr_eq(&got, &loaded));
        }
    }

    #[test]
    fn test_first_outcome_wins() {
        let id = AssetId::from("x");
        let ticket = LoadTicket::new(id.clone());
        ticket.complete(Err(Error::load_failure(&id, "boom")));
        ticket.complete(Ok(asset("x")));

        let pending = PendingAsset::new(ticket);
        assert!(matches!(pending.wait(), Err(Error::LoadFailure { .. })));
    }

    #[test]
    fn test_wait_timeout() {
        let ticket = LoadTicket::new(AssetId::from("slow"));
        let pending = PendingAsset::new(Arc::clone(&ticket));

        assert!(pending.try_get().is_none());
        assert_eq!(
            pending.wait_timeout(Duration::from_millis(10)).unwrap_err(),
            Error::Timeout {
                id: AssetId::from("slow")
            }
        );

        ticket.complete(Ok(asset("slow")));
        assert!(pending.wait_timeout(Duration::from_millis(10)).is_ok());
    }
}
