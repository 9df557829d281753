//! Engine facade wiring the cache tiers together.
//!
//! `CacheEngine` is the composition root the application talks to: one
//! instance per process, constructor-injected fetcher and backend, no
//! global state. Screens call `resolve` before rendering media,
//! `warm` when a content list arrives, `sweep` on pull-to-refresh, and
//! `on_screen_exit` when navigating away.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::backend::{BackendApi, NoopBackend};
use crate::config::EngineConfig;
use crate::content::{ContentItem, ContentRef, Message};
use crate::disk::{CacheError, DiskObjectCache, Resolved};
use crate::fetch::{FetchError, ObjectFetcher};
use crate::gateway::MetadataGateway;
use crate::preload::{PreloadOutcome, PreloadProgress, PreloadState, Preloader, PurchaseQuery};
use crate::stats::CacheStats;
use crate::sweep::SweepReport;
use crate::thread_cache::{ReplyFetcher, ThreadReplyCache, WarmReport};

/// Client-side content cache and preload engine.
pub struct CacheEngine<F: ObjectFetcher, B: BackendApi = NoopBackend> {
    disk: Arc<DiskObjectCache<F>>,
    preloader: Preloader<F>,
    gateway: MetadataGateway<B>,
    threads: ThreadReplyCache,
    config: EngineConfig,
}

impl<F: ObjectFetcher> CacheEngine<F, NoopBackend> {
    /// Open an engine without a backend connection.
    ///
    /// Gated-state accessors answer negatively; the disk cache, preload
    /// pipeline, and sweeper are fully functional.
    pub fn open(config: EngineConfig, fetcher: F) -> Result<Self, CacheError> {
        Self::with_backend(config, fetcher, NoopBackend)
    }
}

impl<F: ObjectFetcher, B: BackendApi> CacheEngine<F, B> {
    /// Open an engine with a live backend.
    pub fn with_backend(config: EngineConfig, fetcher: F, backend: B) -> Result<Self, CacheError> {
        let disk = Arc::new(DiskObjectCache::open(config.cache_dir.clone(), fetcher)?);
        let preloader = Preloader::new(disk.clone(), config.preload.clone());
        let gateway = MetadataGateway::new(backend, config.ttl.clone());

        info!(
            cache_dir = %config.cache_dir.display(),
            max_entries = config.sweep.max_entries,
            "cache engine ready"
        );

        Ok(Self {
            disk,
            preloader,
            gateway,
            threads: ThreadReplyCache::new(),
            config,
        })
    }

    /// Resolve a content reference to a local path or the remote URL.
    pub fn resolve(&self, content: &ContentRef) -> Resolved {
        self.disk.resolve(content)
    }

    /// Download one object into the cache; `None` means fall back to the
    /// remote URL.
    pub async fn fetch(&self, content: &ContentRef) -> Option<PathBuf> {
        self.disk.put(content).await
    }

    /// Warm the cache for a content list.
    pub async fn warm(
        &self,
        query: &PurchaseQuery,
        items: &[ContentItem],
        progress_tx: mpsc::Sender<PreloadProgress>,
        cancel: &CancellationToken,
    ) -> PreloadOutcome {
        self.preloader.preload(query, items, progress_tx, cancel).await
    }

    /// List the user's purchases, then warm the cache for them.
    pub async fn warm_purchases(
        &self,
        user_id: &str,
        query: &PurchaseQuery,
        progress_tx: mpsc::Sender<PreloadProgress>,
        cancel: &CancellationToken,
    ) -> Result<PreloadOutcome, FetchError> {
        let items = self
            .gateway
            .backend()
            .list_purchases(user_id, query.kind, query.creator_id.as_deref())
            .await?;
        Ok(self.warm(query, &items, progress_tx, cancel).await)
    }

    /// Sweep the cache directory against the configured policy.
    ///
    /// Pull-to-refresh hook. Failures are not fatal to the caller.
    pub fn sweep(&self) -> Result<SweepReport, CacheError> {
        self.disk.sweep(&self.config.sweep)
    }

    /// Whether the user has paid for a content item (cached).
    pub async fn purchase_status(
        &self,
        user_id: &str,
        content_id: &str,
    ) -> Result<bool, FetchError> {
        self.gateway.purchase_status(user_id, content_id).await
    }

    /// Invalidate the cached entitlement after a successful payment and
    /// forget the session's preload fingerprints, since the purchase
    /// changes the content list.
    pub fn record_payment_success(&self, user_id: &str, content_id: &str) {
        self.gateway.record_payment_success(user_id, content_id);
        self.preloader.reset_session();
    }

    /// Follower count for a creator (cached).
    pub async fn follower_count(&self, creator_name: &str) -> Result<u64, FetchError> {
        self.gateway.follower_count(creator_name).await
    }

    /// Cached generated-thumbnail path for a content item.
    pub fn cached_thumbnail(&self, content_id: &str) -> Option<PathBuf> {
        self.gateway.cached_thumbnail(content_id)
    }

    /// Remember a generated thumbnail path.
    pub fn store_thumbnail(&self, content_id: &str, path: &std::path::Path) {
        self.gateway.store_thumbnail(content_id, path)
    }

    /// Warm the thread-reply cache for a channel's parent messages.
    pub async fn warm_threads<R: ReplyFetcher>(
        &self,
        parents: &[Message],
        fetcher: &R,
    ) -> WarmReport {
        self.threads.warm(parents, fetcher).await
    }

    /// Cached replies for a parent message.
    pub fn thread_replies(&self, parent_id: &str) -> Option<Vec<Message>> {
        self.threads.replies(parent_id)
    }

    /// Screen-teardown hook: purge expired metadata.
    pub fn on_screen_exit(&self) -> usize {
        self.gateway.cleanup()
    }

    /// Current preload state.
    pub fn preload_state(&self) -> PreloadState {
        self.preloader.state()
    }

    /// Snapshot of disk cache counters.
    pub fn stats(&self) -> CacheStats {
        self.disk.stats()
    }

    /// Number of cached objects.
    pub fn entry_count(&self) -> usize {
        self.disk.entry_count()
    }

    /// The underlying disk cache.
    pub fn disk(&self) -> &DiskObjectCache<F> {
        &self.disk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use crate::fetch::FetchError;
    use bytes::Bytes;
    use tempfile::TempDir;

    struct StaticFetcher;

    impl ObjectFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
            Ok(Bytes::from_static(b"payload"))
        }
    }

    fn engine(temp: &TempDir) -> CacheEngine<StaticFetcher> {
        let config = EngineConfig::default().with_cache_dir(temp.path().to_path_buf());
        CacheEngine::open(config, StaticFetcher).unwrap()
    }

    #[tokio::test]
    async fn test_engine_fetch_and_resolve() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        let content = ContentRef::new("https://cdn.example.com/a.jpg", ContentKind::Image);

        assert!(!engine.resolve(&content).is_local());
        engine.fetch(&content).await.unwrap();
        assert!(engine.resolve(&content).is_local());
        assert_eq!(engine.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_engine_without_backend_answers_negatively() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);

        assert!(!engine.purchase_status("u1", "c1").await.unwrap());
        assert_eq!(engine.follower_count("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_payment_success_resets_preload_session() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);
        let items = vec![ContentItem {
            id: "c1".into(),
            creator_id: "alice".into(),
            kind: ContentKind::Image,
            url: "https://cdn.example.com/a.jpg".into(),
        }];
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let first = engine
            .warm(&PurchaseQuery::default(), &items, tx.clone(), &cancel)
            .await;
        assert!(matches!(first, PreloadOutcome::Completed { .. }));

        let repeat = engine
            .warm(&PurchaseQuery::default(), &items, tx.clone(), &cancel)
            .await;
        assert_eq!(repeat, PreloadOutcome::Deduplicated);

        engine.record_payment_success("u1", "c1");
        let after_payment = engine
            .warm(&PurchaseQuery::default(), &items, tx, &cancel)
            .await;
        assert!(matches!(after_payment, PreloadOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn test_thumbnail_pass_through() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp);

        assert_eq!(engine.cached_thumbnail("c1"), None);
        engine.store_thumbnail("c1", std::path::Path::new("/tmp/t.jpg"));
        assert_eq!(engine.cached_thumbnail("c1"), Some(PathBuf::from("/tmp/t.jpg")));
    }
}
