//! Cache Statistics Module
//!
//! Tracks how lookups were answered and how refreshes ended.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from memory without waiting
    pub hits: u64,
    /// Lookups that waited on a refresh they started or joined
    pub misses: u64,
    /// Refreshes started (synchronous or background)
    pub refreshes: u64,
    /// Lookups that joined a refresh already in flight
    pub joins: u64,
    /// Refreshes that ended in failure after all attempts
    pub fetch_failures: u64,
    /// Fetch attempts cut off by the timeout
    pub timeouts: u64,
    /// Lookups answered with the previous envelope after a failed refresh
    pub stale_served: u64,
    /// Envelopes that could not be written to the store
    pub persistence_failures: u64,
    /// Background refresh requests declined (fresh or already in flight)
    pub async_skipped: u64,
    /// Number of registered resources
    pub resources: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Share of lookups served without waiting on a refresh.
    ///
    /// Returns 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by the cache and its refresh tasks.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    joins: AtomicU64,
    fetch_failures: AtomicU64,
    timeouts: AtomicU64,
    stale_served: AtomicU64,
    persistence_failures: AtomicU64,
    async_skipped: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_served(&self) {
        self.stale_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_async_skip(&self) {
        self.async_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters.
    pub fn snapshot(&self, resources: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            async_skipped: self.async_skipped.load(Ordering::Relaxed),
            resources,
        }
    }
}
