//! Capability for querying the remote copy of an artifact.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::RemoteError;

/// Remote file server holding the authoritative artifacts.
///
/// Implementations apply their own transport-level timeouts; the cache adds
/// none on top.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Last modification time of the remote artifact.
    async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>, RemoteError>;

    /// Full contents of the remote artifact.
    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError>;
}

#[async_trait]
impl<T: RemoteSource + ?Sized> RemoteSource for Arc<T> {
    async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>, RemoteError> {
        (**self).modified_at(url).await
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        (**self).fetch(url).await
    }
}
