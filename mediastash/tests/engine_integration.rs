//! Integration tests for the cache engine.
//!
//! These exercise the complete flow a client session goes through:
//! listing purchases, preloading, resolving through the disk cache,
//! restarting the process, and sweeping on pull-to-refresh.
//!
//! Run with: `cargo test --test engine_integration`

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use mediastash::config::EngineConfig;
use mediastash::content::{ContentItem, ContentKind, ContentRef};
use mediastash::derive_key;
use mediastash::engine::CacheEngine;
use mediastash::fetch::{FetchError, ObjectFetcher};
use mediastash::preload::{PreloadOutcome, PreloadProgress, PurchaseQuery};
use mediastash::{BackendApi, Resolved};

// ============================================================================
// Mock implementations
// ============================================================================

/// Object store serving configured payloads per URL.
#[derive(Default)]
struct MockStore {
    payloads: Mutex<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MockStore {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn serve(&self, url: &str, payload: &[u8]) {
        self.payloads
            .lock()
            .unwrap()
            .insert(url.to_string(), payload.to_vec());
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ObjectFetcher for MockStore {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.payloads.lock().unwrap().get(url) {
            Some(payload) => Ok(Bytes::from(payload.clone())),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

/// Backend returning a fixed purchase list.
struct MockBackend {
    purchases: Vec<ContentItem>,
}

impl BackendApi for MockBackend {
    async fn list_purchases(
        &self,
        _user_id: &str,
        kind: Option<ContentKind>,
        creator_id: Option<&str>,
    ) -> Result<Vec<ContentItem>, FetchError> {
        Ok(self
            .purchases
            .iter()
            .filter(|item| kind.is_none_or(|k| item.kind == k))
            .filter(|item| creator_id.is_none_or(|c| item.creator_id == c))
            .cloned()
            .collect())
    }

    async fn purchase_status(&self, _user_id: &str, content_id: &str) -> Result<bool, FetchError> {
        Ok(self.purchases.iter().any(|item| item.id == content_id))
    }

    async fn follower_count(&self, _creator_name: &str) -> Result<u64, FetchError> {
        Ok(42)
    }
}

fn items(store: &MockStore, count: usize) -> Vec<ContentItem> {
    (0..count)
        .map(|i| {
            let url = format!("https://cdn.example.com/p/{i}.jpg");
            store.serve(&url, format!("payload-{i}").as_bytes());
            ContentItem {
                id: format!("item-{i}"),
                creator_id: "alice".into(),
                kind: ContentKind::Image,
                url,
            }
        })
        .collect()
}

fn config(temp: &tempfile::TempDir) -> EngineConfig {
    EngineConfig::default()
        .with_cache_dir(temp.path().to_path_buf())
        .with_preload_throttle(Duration::ZERO)
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_preload_then_resolve_session() {
    let temp = tempfile::TempDir::new().unwrap();
    let store = MockStore::new();
    let list = items(&store, 3);
    let engine = CacheEngine::open(config(&temp), store.clone()).unwrap();

    let (tx, mut rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    let outcome = engine
        .warm(&PurchaseQuery::default(), &list, tx, &cancel)
        .await;
    assert_eq!(
        outcome,
        PreloadOutcome::Completed {
            downloaded: 3,
            skipped: 0
        }
    );

    // Progress arrived in order with the documented percentages.
    let mut pcts = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let PreloadProgress::Fetched { pct, .. } = event {
            pcts.push(pct);
        }
    }
    assert_eq!(pcts.len(), 3);
    assert!(pcts.windows(2).all(|w| w[0] < w[1]));
    assert!((pcts[2] - 100.0).abs() < f64::EPSILON);

    // Every item resolves locally and byte-identically.
    for (i, item) in list.iter().enumerate() {
        match engine.resolve(&item.content_ref()) {
            Resolved::Local(path) => {
                let bytes = std::fs::read(path).unwrap();
                assert_eq!(bytes, format!("payload-{i}").as_bytes());
            }
            Resolved::Remote(url) => panic!("{url} should be cached"),
        }
    }
    assert_eq!(store.fetch_count(), 3);
}

#[tokio::test]
async fn test_cache_survives_engine_restart() {
    let temp = tempfile::TempDir::new().unwrap();
    let store = MockStore::new();
    let content = ContentRef::new("https://cdn.example.com/keep.mp4", ContentKind::Video);
    store.serve(&content.url, b"video-bytes");

    {
        let engine = CacheEngine::open(config(&temp), store.clone()).unwrap();
        engine.fetch(&content).await.unwrap();
    }

    // A fresh engine rebuilds its index from the directory listing and
    // serves the object without touching the network.
    let engine = CacheEngine::open(config(&temp), store.clone()).unwrap();
    assert_eq!(engine.entry_count(), 1);
    assert!(engine.resolve(&content).is_local());
    assert_eq!(store.fetch_count(), 1);
}

#[tokio::test]
async fn test_sweep_bounds_directory_size() {
    let temp = tempfile::TempDir::new().unwrap();
    let store = MockStore::new();
    let list = items(&store, 55);
    let engine = CacheEngine::open(config(&temp), store.clone()).unwrap();

    let (tx, _rx) = mpsc::channel(128);
    let cancel = CancellationToken::new();
    engine
        .warm(&PurchaseQuery::default(), &list, tx, &cancel)
        .await;
    assert_eq!(engine.entry_count(), 55);

    let report = engine.sweep().unwrap();
    assert_eq!(report.examined, 55);
    assert_eq!(report.deleted, 10);
    assert!(std::fs::read_dir(temp.path()).unwrap().count() <= 45);

    // The removed ten are the lexicographically smallest filenames.
    let mut expected: Vec<String> = list
        .iter()
        .map(|item| format!("{}.jpg", derive_key(&item.url)))
        .collect();
    expected.sort();
    for name in &expected[..10] {
        assert!(!temp.path().join(name).exists(), "{name} should be evicted");
    }
    for name in &expected[10..] {
        assert!(temp.path().join(name).exists(), "{name} should survive");
    }
}

#[tokio::test]
async fn test_warm_purchases_via_backend() {
    let temp = tempfile::TempDir::new().unwrap();
    let store = MockStore::new();
    let mut purchases = items(&store, 4);
    purchases[3].creator_id = "bob".into();

    let engine = CacheEngine::with_backend(
        config(&temp),
        store.clone(),
        MockBackend { purchases },
    )
    .unwrap();

    let query = PurchaseQuery {
        kind: Some(ContentKind::Image),
        creator_id: Some("alice".into()),
    };
    let (tx, _rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    let outcome = engine
        .warm_purchases("u1", &query, tx, &cancel)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PreloadOutcome::Completed {
            downloaded: 3,
            skipped: 0
        }
    );
    assert_eq!(engine.entry_count(), 3);
}

#[tokio::test]
async fn test_failed_downloads_degrade_to_remote() {
    let temp = tempfile::TempDir::new().unwrap();
    let store = MockStore::new();
    // Two known URLs, one that will 404.
    let mut list = items(&store, 2);
    list.push(ContentItem {
        id: "missing".into(),
        creator_id: "alice".into(),
        kind: ContentKind::Image,
        url: "https://cdn.example.com/p/missing.jpg".into(),
    });
    let engine = CacheEngine::open(config(&temp), store.clone()).unwrap();

    let (tx, _rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    let outcome = engine
        .warm(&PurchaseQuery::default(), &list, tx, &cancel)
        .await;

    // The run completes; the failed item stays remote.
    assert_eq!(
        outcome,
        PreloadOutcome::Completed {
            downloaded: 2,
            skipped: 0
        }
    );
    assert!(!engine.resolve(&list[2].content_ref()).is_local());
    assert_eq!(engine.stats().failed_downloads, 1);
}

#[tokio::test]
async fn test_entitlement_flow_with_backend() {
    let temp = tempfile::TempDir::new().unwrap();
    let store = MockStore::new();
    let purchases = items(&store, 1);
    let engine =
        CacheEngine::with_backend(config(&temp), store.clone(), MockBackend { purchases })
            .unwrap();

    assert!(engine.purchase_status("u1", "item-0").await.unwrap());
    assert!(!engine.purchase_status("u1", "other").await.unwrap());
    assert_eq!(engine.follower_count("alice").await.unwrap(), 42);

    engine.record_payment_success("u1", "item-0");
    assert!(engine.purchase_status("u1", "item-0").await.unwrap());

    // Expired and fresh entries alike disappear on screen exit only
    // once their TTL has lapsed; here nothing is expired yet.
    assert_eq!(engine.on_screen_exit(), 0);
}
