//! Disk-backed object cache for purchased media.
//!
//! Large binaries (images, video, PDFs) are stored in a single flat
//! directory as `{key}{extension}`. There is no manifest: the directory
//! listing is the durable state, and the in-memory key→path index is
//! rebuilt from it when the cache is opened.
//!
//! The cache is an optimization, never a dependency. Every failure path
//! on the read side degrades to "behave as if uncached" and the caller
//! keeps working against the remote URL.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::ContentRef;
use crate::fetch::ObjectFetcher;
use crate::flight::{Flight, FlightMap};
use crate::key::{cache_filename, derive_key};
use crate::stats::CacheStats;

/// Cache-maintenance errors.
///
/// Only constructors and explicit maintenance operations surface these;
/// the read path (`resolve`, `put`) swallows failures into fallbacks.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache maintenance.
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result of resolving a content reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The object is cached; render from this local file.
    Local(PathBuf),
    /// Not cached; render from the remote URL.
    Remote(String),
}

impl Resolved {
    /// Whether this resolved to a local cached file.
    pub fn is_local(&self) -> bool {
        matches!(self, Resolved::Local(_))
    }
}

/// One indexed object.
///
/// The source URL is unknown for entries rebuilt from a directory scan;
/// collision checks against those fall back to comparing paths.
struct IndexEntry {
    path: PathBuf,
    source_url: Option<String>,
}

/// Persistent key→path store for large binary payloads.
pub struct DiskObjectCache<F> {
    cache_dir: PathBuf,
    index: Mutex<HashMap<String, IndexEntry>>,
    flight: FlightMap,
    fetcher: F,
    stats: Mutex<CacheStats>,
}

impl<F: ObjectFetcher> DiskObjectCache<F> {
    /// Open the cache rooted at `cache_dir`, creating the directory if
    /// missing and rebuilding the index from the existing listing.
    pub fn open(cache_dir: impl Into<PathBuf>, fetcher: F) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        let cache = Self {
            cache_dir,
            index: Mutex::new(HashMap::new()),
            flight: FlightMap::new(),
            fetcher,
            stats: Mutex::new(CacheStats::new()),
        };
        cache.scan_cache_dir()?;

        info!(
            cache_dir = %cache.cache_dir.display(),
            entries = cache.entry_count(),
            "Disk object cache opened"
        );
        Ok(cache)
    }

    /// Rebuild the index from the directory listing.
    ///
    /// Filenames are `{key}{extension}`; stripping the extension recovers
    /// the key. Subdirectories and non-UTF-8 names are skipped.
    fn scan_cache_dir(&self) -> Result<(), CacheError> {
        let mut index = self.index.lock().unwrap();
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(key) = path.file_stem().and_then(|s| s.to_str()) {
                index.insert(
                    key.to_string(),
                    IndexEntry {
                        path,
                        source_url: None,
                    },
                );
            }
        }
        Ok(())
    }

    /// Whether `key` is present in the in-memory index.
    ///
    /// Fast path only: does not verify the backing file still exists.
    pub fn has(&self, key: &str) -> bool {
        self.index.lock().unwrap().contains_key(key)
    }

    /// Resolve a content reference to a local path or the remote URL.
    ///
    /// A miss is not an error; callers render from whichever is returned.
    /// An index entry whose backing file disappeared is dropped so the
    /// next `put` re-downloads it.
    pub fn resolve(&self, content: &ContentRef) -> Resolved {
        let key = derive_key(&content.url);
        let entry = {
            let index = self.index.lock().unwrap();
            index
                .get(&key)
                .map(|e| (e.path.clone(), e.source_url.clone()))
        };

        if let Some((path, source_url)) = entry {
            if path.exists() {
                self.note_collision(&key, source_url.as_deref(), &content.url);
                self.stats.lock().unwrap().record_hit();
                return Resolved::Local(path);
            }
            warn!(key = %key, path = %path.display(), "stale index entry, falling back to remote");
            self.index.lock().unwrap().remove(&key);
        }

        self.stats.lock().unwrap().record_miss();
        Resolved::Remote(content.url.clone())
    }

    /// Download a content object into the cache.
    ///
    /// Idempotent: an already-cached key returns its existing path without
    /// touching the network. Concurrent calls for the same key share one
    /// download. Any failure is logged and reported as `None`; the caller
    /// falls back to the remote URL.
    pub async fn put(&self, content: &ContentRef) -> Option<PathBuf> {
        let key = derive_key(&content.url);

        if let Some(path) = self.indexed_path(&key, &content.url) {
            return Some(path);
        }

        match self.flight.join(&key) {
            Flight::Waiter(mut rx) => {
                self.stats.lock().unwrap().record_coalesced();
                debug!(key = %key, "joined in-flight download");
                rx.recv().await.unwrap_or(None)
            }
            Flight::Leader(guard) => {
                // Another caller may have registered the key between the
                // fast-path check and winning the flight. The guard frees
                // the key even if this future is dropped mid-download.
                let result = match self.indexed_path(&key, &content.url) {
                    Some(path) => Some(path),
                    None => self.download(content, &key).await,
                };
                guard.complete(result.clone());
                result
            }
        }
    }

    /// Remove the index entry for `key` and delete its backing file.
    ///
    /// Deleting a file that is already gone is not an error.
    pub fn invalidate(&self, key: &str) {
        let removed = self.index.lock().unwrap().remove(key);
        if let Some(IndexEntry { path, .. }) = removed {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(key = %key, error = %e, "failed to delete cached file");
                }
            }
        }
    }

    /// Number of entries in the index.
    pub fn entry_count(&self) -> usize {
        self.index.lock().unwrap().len()
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().unwrap().clone()
    }

    /// The cache directory root.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn indexed_path(&self, key: &str, url: &str) -> Option<PathBuf> {
        let (path, source_url) = {
            let index = self.index.lock().unwrap();
            let entry = index.get(key)?;
            (entry.path.clone(), entry.source_url.clone())
        };
        self.note_collision(key, source_url.as_deref(), url);
        Some(path)
    }

    /// A collision is a distinct URL mapping onto an already-registered
    /// key; the cached object is served regardless.
    fn note_collision(&self, key: &str, cached_url: Option<&str>, requested_url: &str) {
        if let Some(cached) = cached_url {
            if cached != requested_url {
                warn!(
                    key = %key,
                    cached = %cached,
                    requested = %requested_url,
                    "cache key collision, serving previously cached object"
                );
                self.stats.lock().unwrap().record_collision();
            }
        }
    }

    async fn download(&self, content: &ContentRef, key: &str) -> Option<PathBuf> {
        let url = download_url(&content.url);
        let body = match self.fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %url, error = %e, "download failed, falling back to remote");
                self.stats.lock().unwrap().record_failed_download();
                return None;
            }
        };

        let path = self.cache_dir.join(cache_filename(content));
        if let Err(e) = tokio::fs::write(&path, &body).await {
            warn!(path = %path.display(), error = %e, "cache write failed, falling back to remote");
            self.stats.lock().unwrap().record_failed_download();
            return None;
        }

        self.register(key, path.clone(), &content.url);
        debug!(key = %key, bytes = body.len(), "cached object");
        Some(path)
    }

    fn register(&self, key: &str, path: PathBuf, source_url: &str) {
        let mut index = self.index.lock().unwrap();
        // Two distinct URLs hashed to the same 32-bit key. The original
        // client never guarded against this; detect and log, latest
        // registration wins. Scanned entries carry no URL, so those are
        // compared by path.
        let collision = index.get(key).is_some_and(|existing| {
            match &existing.source_url {
                Some(cached) => cached != source_url,
                None => existing.path != path,
            }
        });
        if collision {
            warn!(
                key = %key,
                replacement = %path.display(),
                url = %source_url,
                "cache key collision, latest registration wins"
            );
        }
        index.insert(
            key.to_string(),
            IndexEntry {
                path,
                source_url: Some(source_url.to_string()),
            },
        );
        drop(index);
        let mut stats = self.stats.lock().unwrap();
        stats.record_write();
        if collision {
            stats.record_collision();
        }
    }

    pub(crate) fn remove_index_entry(&self, key: &str) {
        self.index.lock().unwrap().remove(key);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        self.stats.lock().unwrap().record_evictions(count);
    }
}

/// Rewrite a "view" object URL into its attachment-disposition form.
///
/// Remote references embed a `/view?` path segment when they point at the
/// inline rendition; the cache wants the downloadable one.
fn download_url(url: &str) -> String {
    url.replacen("/view?", "/download?", 1)
}
