//! Backend document-database queries consumed by the engine.
//!
//! The engine treats these as opaque, possibly slow, possibly failing
//! calls and wraps them with caching. Applications provide the concrete
//! implementation; tests use mocks.

use std::future::Future;

use crate::content::{ContentItem, ContentKind};
use crate::fetch::FetchError;

/// Backend query API for purchases and social facts.
pub trait BackendApi: Send + Sync {
    /// List the content items a user has purchased, optionally filtered
    /// by kind and creator.
    fn list_purchases(
        &self,
        user_id: &str,
        kind: Option<ContentKind>,
        creator_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<ContentItem>, FetchError>> + Send;

    /// Whether the user has paid for the given content item.
    fn purchase_status(
        &self,
        user_id: &str,
        content_id: &str,
    ) -> impl Future<Output = Result<bool, FetchError>> + Send;

    /// Follower count for a creator.
    fn follower_count(
        &self,
        creator_name: &str,
    ) -> impl Future<Output = Result<u64, FetchError>> + Send;
}

/// Backend that answers every query with an empty or negative result.
///
/// Useful when the engine is run without a backend connection, such as
/// from the CLI or in tests that only exercise the disk cache.
#[derive(Debug, Clone, Default)]
pub struct NoopBackend;

impl BackendApi for NoopBackend {
    async fn list_purchases(
        &self,
        _user_id: &str,
        _kind: Option<ContentKind>,
        _creator_id: Option<&str>,
    ) -> Result<Vec<ContentItem>, FetchError> {
        Ok(Vec::new())
    }

    async fn purchase_status(&self, _user_id: &str, _content_id: &str) -> Result<bool, FetchError> {
        Ok(false)
    }

    async fn follower_count(&self, _creator_name: &str) -> Result<u64, FetchError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_backend_answers_negatively() {
        let backend = NoopBackend;
        assert!(backend
            .list_purchases("u1", None, None)
            .await
            .unwrap()
            .is_empty());
        assert!(!backend.purchase_status("u1", "c1").await.unwrap());
        assert_eq!(backend.follower_count("alice").await.unwrap(), 0);
    }
}
