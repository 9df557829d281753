//! Session cache for chat thread replies.
//!
//! The same read-through pattern as the disk cache, scoped down: replies
//! are small JSON payloads, so warming fans out concurrently instead of
//! the preload pipeline's deliberate seriality, and entries never expire
//! within a session. Replies are append-only; reopening a thread later
//! refreshes it by re-running the same fetch. Process restart tears the
//! cache down.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::content::Message;
use crate::fetch::FetchError;

/// Page size for reply fetches during warming.
pub const REPLY_PAGE_SIZE: usize = 50;

/// Fetches the replies threaded under a parent message.
pub trait ReplyFetcher: Send + Sync {
    fn replies(
        &self,
        parent_id: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Message>, FetchError>> + Send;
}

/// Outcome of one warming pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmReport {
    /// Parents whose replies were fetched and stored.
    pub warmed: usize,
    /// Parents whose fetch failed; lookups for them go to the network.
    pub failed: usize,
    /// Parents with no replies, skipped outright.
    pub skipped: usize,
}

/// Reply cache keyed by parent message id.
#[derive(Default)]
pub struct ThreadReplyCache {
    entries: Mutex<HashMap<String, Vec<Message>>>,
}

impl ThreadReplyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warm the cache for every parent in a channel with replies.
    ///
    /// One fetch per reply-bearing parent, all in flight at once;
    /// failures are logged and skipped, never propagated (allSettled
    /// semantics). Parents already cached are fetched again, which is
    /// how a reopened thread picks up new replies.
    pub async fn warm<F: ReplyFetcher>(&self, parents: &[Message], fetcher: &F) -> WarmReport {
        let targets: Vec<&Message> = parents.iter().filter(|m| m.reply_count > 0).collect();
        let skipped = parents.len() - targets.len();

        let fetches = targets.iter().map(|parent| async {
            let result = fetcher.replies(&parent.id, REPLY_PAGE_SIZE).await;
            (parent.id.clone(), result)
        });

        let mut report = WarmReport {
            skipped,
            ..Default::default()
        };
        for (parent_id, result) in join_all(fetches).await {
            match result {
                Ok(replies) => {
                    debug!(parent = %parent_id, replies = replies.len(), "thread warmed");
                    self.entries.lock().unwrap().insert(parent_id, replies);
                    report.warmed += 1;
                }
                Err(e) => {
                    warn!(parent = %parent_id, error = %e, "thread warm failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Cached replies for a parent, if warmed. A hit means no network
    /// call is needed.
    pub fn replies(&self, parent_id: &str) -> Option<Vec<Message>> {
        self.entries.lock().unwrap().get(parent_id).cloned()
    }

    /// Store replies fetched outside of warming (e.g. opening a thread).
    pub fn insert(&self, parent_id: impl Into<String>, replies: Vec<Message>) {
        self.entries.lock().unwrap().insert(parent_id.into(), replies);
    }

    /// Whether a parent's replies are cached.
    pub fn contains(&self, parent_id: &str) -> bool {
        self.entries.lock().unwrap().contains_key(parent_id)
    }

    /// Number of warmed threads.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Drop everything, as a process restart would.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}
