//! Read-through caching of backend facts.
//!
//! Every call site that renders gated state checks the metadata store
//! first and only queries the backend on a miss, then stores the result
//! with the TTL of its key family. Payment successes invalidate the
//! matching purchase key synchronously so the next read is a guaranteed
//! source-of-truth query.

use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use crate::backend::BackendApi;
use crate::fetch::FetchError;
use crate::metadata::{follower_key, purchase_key, thumbnail_key, MetadataStore, TtlPolicy};

/// Cached facade over the backend query API.
pub struct MetadataGateway<B> {
    store: MetadataStore,
    backend: B,
    ttl: TtlPolicy,
}

impl<B: BackendApi> MetadataGateway<B> {
    pub fn new(backend: B, ttl: TtlPolicy) -> Self {
        Self {
            store: MetadataStore::new(),
            backend,
            ttl,
        }
    }

    /// Whether the user has paid for a content item, cached ~2 minutes.
    pub async fn purchase_status(
        &self,
        user_id: &str,
        content_id: &str,
    ) -> Result<bool, FetchError> {
        let key = purchase_key(user_id, content_id);
        if let Some(cached) = self.store.get(&key).and_then(|v| v.as_bool()) {
            return Ok(cached);
        }

        let fresh = self.backend.purchase_status(user_id, content_id).await?;
        self.store.set(key, Value::Bool(fresh), self.ttl.purchase_status);
        Ok(fresh)
    }

    /// Drop the cached entitlement after a successful payment.
    pub fn record_payment_success(&self, user_id: &str, content_id: &str) {
        let key = purchase_key(user_id, content_id);
        self.store.delete(&key);
        debug!(key = %key, "entitlement invalidated after payment");
    }

    /// Follower count for a creator, cached ~5 minutes.
    pub async fn follower_count(&self, creator_name: &str) -> Result<u64, FetchError> {
        let key = follower_key(creator_name);
        if let Some(cached) = self.store.get(&key).and_then(|v| v.as_u64()) {
            return Ok(cached);
        }

        let fresh = self.backend.follower_count(creator_name).await?;
        self.store.set(key, Value::from(fresh), self.ttl.follower_count);
        Ok(fresh)
    }

    /// Cached generated-thumbnail path, if one was stored recently.
    pub fn cached_thumbnail(&self, content_id: &str) -> Option<PathBuf> {
        self.store
            .get(&thumbnail_key(content_id))
            .and_then(|v| v.as_str().map(PathBuf::from))
    }

    /// Remember a generated thumbnail path for ~24 hours.
    pub fn store_thumbnail(&self, content_id: &str, path: &std::path::Path) {
        self.store.set(
            thumbnail_key(content_id),
            Value::String(path.to_string_lossy().into_owned()),
            self.ttl.thumbnail,
        );
    }

    /// Purge expired entries; call when leaving a screen.
    pub fn cleanup(&self) -> usize {
        self.store.cleanup()
    }

    /// The underlying store, for direct access in tests.
    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
