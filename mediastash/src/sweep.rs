//! Opportunistic capacity-based eviction.
//!
//! The sweeper bounds the cache by object count, not recency: once the
//! directory holds more than `max_entries` files, the `batch_size`
//! lexicographically smallest filenames are deleted. Filenames are
//! decimal hashes, so the order is effectively random with respect to
//! access time. Earlier cache directories were written under exactly
//! this policy, and it is reproduced here so their contents evict
//! predictably; an access-time policy would change which files survive.
//!
//! Runs to completion once started; it is short, local, and synchronous.

use std::fs;
use std::io;

use tracing::{info, warn};

use crate::disk::{CacheError, DiskObjectCache};
use crate::fetch::ObjectFetcher;

/// Eviction thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Object count above which a sweep evicts.
    pub max_entries: usize,
    /// Number of files removed per sweep.
    pub batch_size: usize,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            max_entries: 50,
            batch_size: 10,
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Files found in the cache directory.
    pub examined: usize,
    /// Files deleted.
    pub deleted: usize,
}

impl<F: ObjectFetcher> DiskObjectCache<F> {
    /// Sweep the cache directory, evicting when over the policy bound.
    ///
    /// Invoked opportunistically (pull-to-refresh, screen teardown), not
    /// on a timer.
    pub fn sweep(&self, policy: &SweepPolicy) -> Result<SweepReport, CacheError> {
        let mut filenames: Vec<String> = Vec::new();
        for entry in fs::read_dir(self.cache_dir())? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                filenames.push(name.to_string());
            }
        }

        let examined = filenames.len();
        if examined <= policy.max_entries {
            return Ok(SweepReport {
                examined,
                deleted: 0,
            });
        }

        filenames.sort();

        let mut deleted = 0;
        for name in filenames.iter().take(policy.batch_size) {
            let path = self.cache_dir().join(name);
            match fs::remove_file(&path) {
                Ok(()) => {
                    let key = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);
                    self.remove_index_entry(key);
                    deleted += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // Already gone; the index entry may still linger.
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "sweep failed to delete file");
                }
            }
        }

        self.record_evictions(deleted as u64);
        info!(
            examined = examined,
            deleted = deleted,
            max_entries = policy.max_entries,
            "cache sweep complete"
        );

        Ok(SweepReport { examined, deleted })
    }
}
