//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::metadata::TtlPolicy;
use crate::preload::PreloadConfig;
use crate::sweep::SweepPolicy;

/// Complete engine configuration.
///
/// Built with defaults and adjusted through the `with_*` methods:
///
/// ```
/// use std::path::PathBuf;
/// use std::time::Duration;
/// use mediastash::config::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_cache_dir(PathBuf::from("/tmp/stash"))
///     .with_preload_throttle(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Flat directory holding cached objects. The directory is the
    /// durable state; the index is rebuilt from its listing at startup.
    pub cache_dir: PathBuf,
    /// Eviction policy applied on opportunistic sweeps.
    pub sweep: SweepPolicy,
    /// Preload pipeline tuning.
    pub preload: PreloadConfig,
    /// Expiry policy per metadata key family.
    pub ttl: TtlPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mediastash");

        Self {
            cache_dir,
            sweep: SweepPolicy::default(),
            preload: PreloadConfig::default(),
            ttl: TtlPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = dir;
        self
    }

    /// Set the entry count above which a sweep evicts.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.sweep.max_entries = max_entries;
        self
    }

    /// Set the number of files removed per sweep.
    pub fn with_sweep_batch(mut self, batch_size: usize) -> Self {
        self.sweep.batch_size = batch_size;
        self
    }

    /// Set the delay inserted between sequential preload downloads.
    pub fn with_preload_throttle(mut self, throttle: Duration) -> Self {
        self.preload.throttle = throttle;
        self
    }

    /// Set the purchase-status TTL.
    pub fn with_purchase_ttl(mut self, ttl: Duration) -> Self {
        self.ttl.purchase_status = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.cache_dir.ends_with("mediastash"));
        assert_eq!(config.sweep.max_entries, 50);
        assert_eq!(config.sweep.batch_size, 10);
        assert_eq!(config.preload.throttle, Duration::from_millis(100));
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::default()
            .with_cache_dir(PathBuf::from("/tmp/stash"))
            .with_max_entries(100)
            .with_sweep_batch(20)
            .with_preload_throttle(Duration::from_millis(10))
            .with_purchase_ttl(Duration::from_secs(30));

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/stash"));
        assert_eq!(config.sweep.max_entries, 100);
        assert_eq!(config.sweep.batch_size, 20);
        assert_eq!(config.preload.throttle, Duration::from_millis(10));
        assert_eq!(config.ttl.purchase_status, Duration::from_secs(30));
    }
}
