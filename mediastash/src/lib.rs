//! Mediastash - client-side content cache and preload engine.
//!
//! Subscribers of a creator-content app consume paid media (images,
//! video, PDFs) fetched from a remote object store, plus volatile
//! metadata (entitlements, follower counts, thumbnails) from a backend
//! database. Both are expensive to re-fetch, so this crate provides the
//! local caching layer: a disk-backed object cache that survives
//! restarts, a TTL metadata store, a sequential preload pipeline that
//! warms the cache for a content list, a count-bounded eviction
//! sweeper, and a session cache for chat thread replies.
//!
//! # High-level API
//!
//! Most hosts talk to the [`engine::CacheEngine`] facade:
//!
//! ```no_run
//! use mediastash::config::EngineConfig;
//! use mediastash::content::{ContentKind, ContentRef};
//! use mediastash::engine::CacheEngine;
//! use mediastash::fetch::ReqwestFetcher;
//!
//! # fn main() -> Result<(), mediastash::disk::CacheError> {
//! let engine = CacheEngine::open(EngineConfig::default(), ReqwestFetcher::new())?;
//!
//! // Always render from whatever resolve returns; a miss is not an error.
//! let content = ContentRef::new("https://cdn.example.com/p/1.jpg", ContentKind::Image);
//! let source = engine.resolve(&content);
//! # let _ = source;
//! # Ok(())
//! # }
//! ```
//!
//! The cache is an optimization, never a dependency: every failure on
//! the read path degrades to the remote URL.

pub mod backend;
pub mod config;
pub mod content;
pub mod disk;
pub mod engine;
pub mod fetch;
mod flight;
pub mod gateway;
pub mod key;
pub mod logging;
pub mod metadata;
pub mod preload;
pub mod stats;
pub mod sweep;
pub mod thread_cache;

pub use backend::{BackendApi, NoopBackend};
pub use config::EngineConfig;
pub use content::{ContentItem, ContentKind, ContentRef, Message};
pub use disk::{CacheError, DiskObjectCache, Resolved};
pub use engine::CacheEngine;
pub use fetch::{FetchError, ObjectFetcher, ReqwestFetcher};
pub use key::derive_key;
pub use metadata::{MetadataStore, TtlPolicy};
pub use preload::{PreloadOutcome, PreloadProgress, PreloadState, Preloader, PurchaseQuery};
pub use stats::CacheStats;
pub use sweep::{SweepPolicy, SweepReport};
pub use thread_cache::{ReplyFetcher, ThreadReplyCache, WarmReport};

/// Version of the mediastash library and CLI, synchronized across the
/// workspace and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
