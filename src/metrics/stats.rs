use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated on every cache operation.
pub struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    extensions: AtomicU64,
    rejected_sets: AtomicU64,
}

impl StatsCounter {
    pub fn new() -> Self {
        StatsCounter {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            extensions: AtomicU64::new(0),
            rejected_sets: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_eviction(&self, count: u64) {
        if count > 0 {
            self.evictions.fetch_add(count, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_extension(&self, count: u64) {
        if count > 0 {
            self.extensions.fetch_add(count, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_rejected_set(&self) {
        self.rejected_sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of the statistics.
    pub fn snapshot(&self) -> Metrics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0_f64
        } else {
            hits as f64 / total as f64
        };
        Metrics {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            extensions: self.extensions.load(Ordering::Relaxed),
            rejected_sets: self.rejected_sets.load(Ordering::Relaxed),
            hit_rate,
        }
    }
}

impl Default for StatsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of cache statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// Number of lookups that found the key.
    pub hits: u64,
    /// Number of lookups that did not.
    pub misses: u64,
    /// Entries removed because their TTL ran out and no hook extended them.
    /// Explicit deletes are not counted.
    pub evictions: u64,
    /// Times a hook kept an expired entry alive.
    pub extensions: u64,
    /// Sets refused because the key existed and overwrites are disabled.
    pub rejected_sets: u64,
    /// `hits / (hits + misses)`, or `0.0` if no lookups have been made.
    pub hit_rate: f64,
}

impl Metrics {
    pub fn request_count(&self) -> u64 {
        self.hits + self.misses
    }
}
