//! Cache Statistics Module
//!
//! Tracks cache performance counters and renders the human-readable summary.

use serde::Serialize;

// == Cache Stats ==
/// Cache performance counters plus a usage snapshot.
///
/// `entries` and `total_bytes` are filled in when a snapshot is taken; the
/// counters accumulate until `reset`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads served from cache
    pub hits: u64,
    /// Reads that had to invoke the loader
    pub misses: u64,
    /// Entries removed by TTL expiry or capacity pressure
    pub evictions: u64,
    /// Entries removed by explicit, pattern, prefix, dependency, or
    /// staleness invalidation
    pub invalidations: u64,
    /// Bytes returned from cache on hits
    pub bytes_served: u64,
    /// Bytes produced by loaders on misses
    pub bytes_read: u64,
    /// Live entry count at snapshot time
    pub entries: usize,
    /// Summed entry sizes at snapshot time
    pub total_bytes: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Cache hit rate, recomputed on demand and never stored.
    ///
    /// Returns hits / max(1, hits + misses), so an untouched cache reads 0.0.
    pub fn hit_rate(&self) -> f64 {
        self.hits as f64 / (self.hits + self.misses).max(1) as f64
    }

    // == Recording ==
    /// Records a read served from cache and the bytes it returned.
    pub fn record_hit(&mut self, size_bytes: usize) {
        self.hits += 1;
        self.bytes_served += size_bytes as u64;
    }

    /// Records a read that fell through to the loader.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Records the bytes a loader produced.
    pub fn record_load(&mut self, size_bytes: usize) {
        self.bytes_read += size_bytes as u64;
    }

    /// Records an entry removed by expiry or capacity pressure.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Records an entry removed by invalidation.
    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // == Formatting ==
    /// Renders the fixed summary block.
    ///
    /// The field set is part of the contract; callers parse nothing out of
    /// it but dashboards rely on the lines being present.
    pub fn format(&self) -> String {
        const MB: f64 = 1024.0 * 1024.0;
        format!(
            "entries: {}\n\
             hit rate: {:.1}%\n\
             total size: {:.2} MB\n\
             bytes served: {:.2} MB\n\
             bytes read: {:.2} MB\n\
             evictions: {}\n\
             invalidations: {}",
            self.entries,
            self.hit_rate() * 100.0,
            self.total_bytes as f64 / MB,
            self.bytes_served as f64 / MB,
            self.bytes_read as f64 / MB,
            self.evictions,
            self.invalidations,
        )
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.invalidations, 0);
        assert_eq!(stats.bytes_served, 0);
        assert_eq!(stats.bytes_read, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit(10);
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_hits_accumulate_bytes_served() {
        let mut stats = CacheStats::new();
        stats.record_hit(100);
        stats.record_hit(50);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.bytes_served, 150);
    }

    #[test]
    fn test_loads_accumulate_bytes_read() {
        let mut stats = CacheStats::new();
        stats.record_load(4096);
        stats.record_load(1024);
        assert_eq!(stats.bytes_read, 5120);
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let mut stats = CacheStats::new();
        stats.record_hit(10);
        stats.record_miss();
        stats.record_eviction();
        stats.record_invalidation();
        stats.reset();

        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.invalidations, 0);
        assert_eq!(stats.bytes_served, 0);
    }

    #[test]
    fn test_format_field_set() {
        let stats = CacheStats {
            hits: 1,
            misses: 1,
            evictions: 7,
            invalidations: 3,
            bytes_served: 1024 * 1024,
            bytes_read: 3 * 1024 * 1024 / 2,
            entries: 42,
            total_bytes: 1024 * 1024,
        };

        let block = stats.format();
        assert!(block.contains("entries: 42"));
        assert!(block.contains("hit rate: 50.0%"));
        assert!(block.contains("total size: 1.00 MB"));
        assert!(block.contains("bytes served: 1.00 MB"));
        assert!(block.contains("bytes read: 1.50 MB"));
        assert!(block.contains("evictions: 7"));
        assert!(block.contains("invalidations: 3"));
    }

    #[test]
    fn test_format_rounds_hit_rate_to_one_decimal() {
        let stats = CacheStats {
            hits: 1,
            misses: 2,
            ..CacheStats::default()
        };
        assert!(stats.format().contains("hit rate: 33.3%"));
    }
}
