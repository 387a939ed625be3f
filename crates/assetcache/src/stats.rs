//! Cache statistics tracking
//!
//! Counters are independent relaxed atomics, so a snapshot taken under
//! concurrent traffic is not a single consistent cut.

use std::sync::atomic::{AtomicU64, Ordering};

/// Something the cache counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    /// Request served from the resident set
    Hit,
    /// Request that had to wait for a load
    Miss,
    /// Loaded asset entered the resident set
    Admission,
    /// Resident asset pushed out to make room
    Eviction,
    /// Resident asset dropped on request
    Release,
    /// Load that ended in an error
    LoadFailure,
}

const EVENTS: usize = 6;

/// Live counters describing cache behaviour
#[derive(Debug, Default)]
pub struct CacheStats {
    counters: [AtomicU64; EVENTS],
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Requests served from the resident set
    pub hits: u64,
    /// Requests that had to wait for a load
    pub misses: u64,
    /// Assets that entered the resident set
    pub admissions: u64,
    /// Assets evicted to make room
    pub evictions: u64,
    /// Assets released by callers
    pub releases: u64,
    /// Loads that failed
    pub load_failures: u64,
}

impl StatsSnapshot {
    /// Hits over all requests, 0.0 when nothing was requested
    pub fn hit_ratio(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            requests => self.hits as f64 / requests as f64,
        }
    }
}

impl CacheStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, event: Event) {
        self.counters[event as usize].fetch_add(1, Ordering::Relaxed);
    }

    fn count(&self, event: Event) -> u64 {
        self.counters[event as usize].load(Ordering::Relaxed)
    }

    /// Copy every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.count(Event::Hit),
            misses: self.count(Event::Miss),
            admissions: self.count(Event::Admission),
            evictions: self.count(Event::Eviction),
            releases: self.count(Event::Release),
            load_failures: self.count(Event::LoadFailure),
        }
    }

    /// Requests served from the resident set
    pub fn hits(&self) -> u64 {
        self.count(Event::Hit)
    }

    /// Requests that had to wait for a load
    pub fn misses(&self) -> u64 {
        self.count(Event::Miss)
    }

    /// Assets that entered the resident set
    pub fn admissions(&self) -> u64 {
        self.count(Event::Admission)
    }

    /// Assets evicted to make room
    pub fn evictions(&self) -> u64 {
        self.count(Event::Eviction)
    }

    /// Assets released by callers
    pub fn releases(&self) -> u64 {
        self.count(Event::Release)
    }

    /// Loads that failed
    pub fn load_failures(&self) -> u64 {
        self.count(Event::LoadFailure)
    }

    /// Hits over all requests (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        self.snapshot().hit_ratio()
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_snapshot() {
        let stats = CacheStats::new();

        stats.record(Event::Hit);
        stats.record(Event::Hit);
        stats.record(Event::Miss);
        stats.record(Event::Admission);
        stats.record(Event::Eviction);

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                hits: 2,
                misses: 1,
                admissions: 1,
                evictions: 1,
                releases: 0,
                load_failures: 0,
            }
        );
        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.hit_ratio(), 2.0 / 3.0);
    }

    #[test]
    fn test_every_event_has_its_own_counter() {
        let stats = CacheStats::new();
        let events = [
            Event::Hit,
            Event::Miss,
            Event::Admission,
            Event::Eviction,
            Event::Release,
            Event::LoadFailure,
        ];
        for (n, event) in events.iter().enumerate() {
            for _ in 0..=n {
                stats.record(*event);
            }
        }

        let snap = stats.snapshot();
        assert_eq!(
            [
                snap.hits,
                snap.misses,
                snap.admissions,
                snap.evictions,
                snap.releases,
                snap.load_failures
            ],
            [1, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn test_stats_reset() {
        let stats = CacheStats::new();

        stats.record(Event::Hit);
        stats.record(Event::Miss);
        stats.record(Event::Release);
        stats.record(Event::LoadFailure);
        stats.reset();

        assert_eq!(stats.snapshot(), StatsSnapshot::default());
        assert_eq!(stats.hit_ratio(), 0.0);
    }
}
