//! Background preload pipeline.
//!
//! Warms the disk cache for a content list: already-cached items are
//! skipped, the remainder downloads strictly sequentially with a small
//! throttle delay between items, and fractional progress is reported
//! over an mpsc channel. Content objects are large binaries, so the
//! seriality is deliberate; compare the reply-prefetch cache, which
//! fans out because its payloads are small JSON.
//!
//! A per-session fingerprint over `(kind filter, creator filter, item
//! count)` suppresses repeat passes when the UI re-renders with the
//! same list. The fingerprint is coarse by design: a list whose
//! composition changed without changing length is skipped anyway.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::content::{ContentItem, ContentKind};
use crate::disk::DiskObjectCache;
use crate::fetch::ObjectFetcher;
use crate::key::derive_key;

/// Preload pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadConfig {
    /// Delay inserted between sequential downloads, yielding to the UI
    /// and keeping the network stack unsaturated.
    pub throttle: Duration,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(100),
        }
    }
}

/// Filters a content listing was requested with.
///
/// Participates in the preload fingerprint together with the item count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PurchaseQuery {
    /// Content-kind filter, if any.
    pub kind: Option<ContentKind>,
    /// Creator filter, if any.
    pub creator_id: Option<String>,
}

#[derive(PartialEq, Eq, Hash)]
struct ListFingerprint {
    kind: Option<ContentKind>,
    creator_id: Option<String>,
    len: usize,
}

impl ListFingerprint {
    fn new(query: &PurchaseQuery, len: usize) -> Self {
        Self {
            kind: query.kind,
            creator_id: query.creator_id.clone(),
            len,
        }
    }
}

/// Progress events emitted while a preload runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PreloadProgress {
    /// The pipeline starts with this many uncached items.
    Starting { total: usize },
    /// One more item finished (downloaded or degraded to remote).
    Fetched {
        completed: usize,
        total: usize,
        /// `completed / total * 100`.
        pct: f64,
    },
    /// The run finished.
    Complete { downloaded: usize, skipped: usize },
    /// The run was cancelled between items.
    Cancelled { completed: usize },
}

/// Pipeline state, queryable while a run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreloadState {
    /// No run started yet, or the last one was cancelled.
    #[default]
    Idle,
    /// A run is in flight.
    Preloading { completed: usize, total: usize },
    /// The last run finished.
    Done,
}

/// Result of a preload call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// The run finished; `skipped` items were already cached or known.
    Completed { downloaded: usize, skipped: usize },
    /// This exact list fingerprint already completed this session.
    Deduplicated,
    /// Another run is in flight.
    AlreadyRunning,
    /// The cancellation token fired between items.
    Cancelled { completed: usize },
}

/// Sequential, throttled cache warmer for content lists.
pub struct Preloader<F> {
    cache: Arc<DiskObjectCache<F>>,
    config: PreloadConfig,
    completed_lists: Mutex<HashSet<ListFingerprint>>,
    known_ids: Mutex<HashSet<String>>,
    state: Mutex<PreloadState>,
}

impl<F: ObjectFetcher> Preloader<F> {
    pub fn new(cache: Arc<DiskObjectCache<F>>, config: PreloadConfig) -> Self {
        Self {
            cache,
            config,
            completed_lists: Mutex::new(HashSet::new()),
            known_ids: Mutex::new(HashSet::new()),
            state: Mutex::new(PreloadState::Idle),
        }
    }

    /// Warm the cache for `items`, reporting progress on `progress_tx`.
    ///
    /// Items download in list order, one at a time; item N+1 never
    /// starts before item N finished. A failed download counts as
    /// completed (the UI will fall back to the remote URL for it) and
    /// does not abort the run. The cancellation token is honored
    /// between items, never mid-download.
    pub async fn preload(
        &self,
        query: &PurchaseQuery,
        items: &[ContentItem],
        progress_tx: mpsc::Sender<PreloadProgress>,
        cancel: &CancellationToken,
    ) -> PreloadOutcome {
        let fingerprint = ListFingerprint::new(query, items.len());

        if self.completed_lists.lock().unwrap().contains(&fingerprint) {
            debug!(items = items.len(), "preload skipped, list already warmed");
            return PreloadOutcome::Deduplicated;
        }

        {
            let mut state = self.state.lock().unwrap();
            if matches!(*state, PreloadState::Preloading { .. }) {
                return PreloadOutcome::AlreadyRunning;
            }
            *state = PreloadState::Preloading {
                completed: 0,
                total: 0,
            };
        }

        let pending: Vec<&ContentItem> = {
            let known = self.known_ids.lock().unwrap();
            items
                .iter()
                .filter(|item| {
                    !known.contains(&item.id) && !self.cache.has(&derive_key(&item.url))
                })
                .collect()
        };
        let skipped = items.len() - pending.len();

        if pending.is_empty() {
            self.completed_lists.lock().unwrap().insert(fingerprint);
            *self.state.lock().unwrap() = PreloadState::Done;
            let _ = progress_tx
                .send(PreloadProgress::Complete {
                    downloaded: 0,
                    skipped,
                })
                .await;
            return PreloadOutcome::Completed {
                downloaded: 0,
                skipped,
            };
        }

        let total = pending.len();
        *self.state.lock().unwrap() = PreloadState::Preloading {
            completed: 0,
            total,
        };
        let _ = progress_tx.send(PreloadProgress::Starting { total }).await;
        info!(total = total, skipped = skipped, "preload starting");

        let mut downloaded = 0;
        let mut completed = 0;
        for item in pending {
            if cancel.is_cancelled() {
                *self.state.lock().unwrap() = PreloadState::Idle;
                info!(completed = completed, total = total, "preload cancelled");
                let _ = progress_tx
                    .send(PreloadProgress::Cancelled { completed })
                    .await;
                return PreloadOutcome::Cancelled { completed };
            }

            if self.cache.put(&item.content_ref()).await.is_some() {
                downloaded += 1;
                self.known_ids.lock().unwrap().insert(item.id.clone());
            }
            completed += 1;

            let pct = completed as f64 / total as f64 * 100.0;
            *self.state.lock().unwrap() = PreloadState::Preloading { completed, total };
            let _ = progress_tx
                .send(PreloadProgress::Fetched {
                    completed,
                    total,
                    pct,
                })
                .await;

            if completed < total && !self.config.throttle.is_zero() {
                tokio::time::sleep(self.config.throttle).await;
            }
        }

        self.completed_lists.lock().unwrap().insert(fingerprint);
        *self.state.lock().unwrap() = PreloadState::Done;
        info!(downloaded = downloaded, skipped = skipped, "preload complete");
        let _ = progress_tx
            .send(PreloadProgress::Complete {
                downloaded,
                skipped,
            })
            .await;

        PreloadOutcome::Completed {
            downloaded,
            skipped,
        }
    }

    /// Current pipeline state.
    pub fn state(&self) -> PreloadState {
        *self.state.lock().unwrap()
    }

    /// Forget completed fingerprints and known ids.
    ///
    /// Used when the underlying listing is known to have changed, e.g.
    /// after a purchase.
    pub fn reset_session(&self) {
        self.completed_lists.lock().unwrap().clear();
        self.known_ids.lock().unwrap().clear();
        *self.state.lock().unwrap() = PreloadState::Idle;
    }
}
