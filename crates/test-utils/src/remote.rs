//! A remote serving fixed bundles by URL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use freshness_cache::{RemoteError, RemoteSource};

/// Serves bundles published with [`StaticRemote::publish`]; anything else
/// is reported as missing. Counts every call.
#[derive(Debug, Default)]
pub struct StaticRemote {
    files: Mutex<HashMap<String, (DateTime<Utc>, Bytes)>>,
    offline: Mutex<bool>,
    calls: AtomicUsize,
}

impl StaticRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, url: &str, modified: DateTime<Utc>, contents: impl Into<Bytes>) {
        self.files
            .lock()
            .unwrap()
            .insert(url.to_string(), (modified, contents.into()));
    }

    /// Fail every call with a connection error until `set_offline(false)`.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, url: &str) -> Result<(DateTime<Utc>, Bytes), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.offline.lock().unwrap() {
            return Err(RemoteError::Connect("connection refused".to_string()));
        }
        self.files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(url.to_string()))
    }
}

#[async_trait]
impl RemoteSource for StaticRemote {
    async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>, RemoteError> {
        self.lookup(url).map(|(modified, _)| modified)
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        self.lookup(url).map(|(_, contents)| contents)
    }
}
