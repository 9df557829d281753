//! In-memory TTL store for small volatile facts.
//!
//! Purchase entitlements, follower counts, and generated thumbnail paths
//! share the store but not the expiry policy. A `get` after expiry is
//! indistinguishable from a `get` that never hit: both return `None` and
//! send the caller back to the source of truth.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

/// Per-family TTLs for metadata entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Entitlements can change mid-session; keep them short-lived.
    pub purchase_status: Duration,
    /// Follower counts drift slowly.
    pub follower_count: Duration,
    /// Generated thumbnails are effectively immutable.
    pub thumbnail: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            purchase_status: Duration::from_secs(2 * 60),
            follower_count: Duration::from_secs(5 * 60),
            thumbnail: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Build the store key for a user's entitlement to a content item.
pub fn purchase_key(user_id: &str, content_id: &str) -> String {
    format!("purchase:{user_id}:{content_id}")
}

/// Build the store key for a creator's follower count.
pub fn follower_key(creator_name: &str) -> String {
    format!("followers:{creator_name}")
}

/// Build the store key for a content item's generated thumbnail path.
pub fn thumbnail_key(content_id: &str) -> String {
    format!("thumb:{content_id}")
}

struct MetadataEntry {
    value: Value,
    expires_at: Instant,
}

/// Key→JSON value store with per-entry expiration.
///
/// No single-flight de-duplication: concurrent misses for the same key
/// may each query the backend. That matches the original client and is
/// acceptable for these small lookups.
#[derive(Default)]
pub struct MetadataStore {
    entries: Mutex<HashMap<String, MetadataEntry>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value, treating absent and expired identically.
    ///
    /// Expired entries are dropped on read.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if Instant::now() <= entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value, unconditionally overwriting and restamping expiry.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let entry = MetadataEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().unwrap().insert(key.into(), entry);
    }

    /// Explicit invalidation after a state-changing event.
    ///
    /// The next `get` for this key is a guaranteed miss, forcing a fresh
    /// source-of-truth read.
    pub fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Purge all expired entries; returns how many were dropped.
    ///
    /// Called at natural breakpoints (leaving a screen) rather than on a
    /// timer.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.expires_at);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged = purged, remaining = entries.len(), "metadata cleanup");
        }
        purged
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    #[test]
    fn test_get_before_expiry() {
        let store = MetadataStore::new();
        store.set("k", json!(true), Duration::from_millis(100));
        assert_eq!(store.get("k"), Some(json!(true)));
    }

    #[test]
    fn test_get_after_expiry_is_none() {
        let store = MetadataStore::new();
        store.set("k", json!(42), Duration::from_millis(10));
        sleep(Duration::from_millis(15));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_absent_key_is_none() {
        let store = MetadataStore::new();
        assert_eq!(store.get("never-set"), None);
    }

    #[test]
    fn test_delete_beats_remaining_ttl() {
        let store = MetadataStore::new();
        store.set("k", json!("v"), Duration::from_secs(60));
        store.delete("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_set_overwrites_and_restamps() {
        let store = MetadataStore::new();
        store.set("k", json!(1), Duration::from_millis(10));
        store.set("k", json!(2), Duration::from_secs(60));
        sleep(Duration::from_millis(15));
        assert_eq!(store.get("k"), Some(json!(2)));
    }

    #[test]
    fn test_cleanup_purges_only_expired() {
        let store = MetadataStore::new();
        store.set("short", json!(1), Duration::from_millis(5));
        store.set("long", json!(2), Duration::from_secs(60));
        sleep(Duration::from_millis(10));

        assert_eq!(store.cleanup(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("long"), Some(json!(2)));
    }

    #[test]
    fn test_key_builders() {
        assert_eq!(purchase_key("u1", "c9"), "purchase:u1:c9");
        assert_eq!(follower_key("alice"), "followers:alice");
        assert_eq!(thumbnail_key("c9"), "thumb:c9");
    }

    #[test]
    fn test_default_ttl_policy() {
        let ttl = TtlPolicy::default();
        assert_eq!(ttl.purchase_status, Duration::from_secs(120));
        assert_eq!(ttl.follower_count, Duration::from_secs(300));
        assert_eq!(ttl.thumbnail, Duration::from_secs(86_400));
    }
}
