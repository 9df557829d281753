//! Cache hit/miss accounting.

/// Counters for disk cache activity.
///
/// Kept behind the cache's lock and cloned out for reporting.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Resolves served from the local cache.
    pub hits: u64,
    /// Resolves that fell back to the remote URL.
    pub misses: u64,
    /// Objects downloaded and registered.
    pub writes: u64,
    /// Downloads that failed and degraded to a remote fallback.
    pub failed_downloads: u64,
    /// Puts that joined an in-flight download instead of starting one.
    pub coalesced: u64,
    /// Files removed by the eviction sweeper.
    pub evictions: u64,
    /// Distinct URLs observed hashing to an already-registered key.
    pub collisions: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_failed_download(&mut self) {
        self.failed_downloads += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }

    pub fn record_collision(&mut self) {
        self.collisions += 1;
    }

    /// Hit ratio over all resolves, 0.0 when nothing was resolved yet.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[test]
    fn test_hit_ratio() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_eviction_accumulates() {
        let mut stats = CacheStats::new();
        stats.record_evictions(10);
        stats.record_evictions(10);
        assert_eq!(stats.evictions, 20);
    }
}
