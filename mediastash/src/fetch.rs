//! HTTP fetch abstraction for testability.
//!
//! The cache downloads through the [`ObjectFetcher`] trait so tests can
//! inject mock clients and the engine never depends on a concrete HTTP
//! stack.

use std::future::Future;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors from remote fetches.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(String),

    /// The remote answered with a non-success status.
    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },
}

/// Async fetcher for remote binary objects.
pub trait ObjectFetcher: Send + Sync {
    /// Fetch the full body at `url`.
    ///
    /// Returns the payload bytes, or an error for transport failures and
    /// non-success statuses alike.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

impl<F: ObjectFetcher + Sync> ObjectFetcher for &F {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send {
        F::fetch(*self, url)
    }
}

impl<F: ObjectFetcher> ObjectFetcher for std::sync::Arc<F> {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send {
        F::fetch(&**self, url)
    }
}

/// Real fetcher backed by a shared reqwest client.
#[derive(Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Create a fetcher with default client settings.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        trace!(url = url, "GET starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "GET failed"
                );
                return Err(FetchError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = url, status = status.as_u16(), "GET returned error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        debug!(url = url, bytes = body.len(), "GET complete");
        Ok(body)
    }
}
