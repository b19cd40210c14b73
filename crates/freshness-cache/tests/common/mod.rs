//! Shared helpers for freshness-cache integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use freshness_cache::{RemoteError, RemoteSource};

pub const TTL_SECS: i64 = 180;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
}

pub fn ts(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs)
}

/// Remote whose answers are set by the test, counting every call.
#[derive(Default)]
pub struct ScriptedRemote {
    modified: Mutex<Option<DateTime<Utc>>>,
    body: Mutex<Option<Bytes>>,
    fetch_delay: Mutex<Duration>,
    modified_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote serving `body` last modified at `modified`.
    pub fn serving(modified: DateTime<Utc>, body: &'static [u8]) -> Self {
        let remote = Self::new();
        remote.publish(modified, body);
        remote
    }

    pub fn publish(&self, modified: DateTime<Utc>, body: &'static [u8]) {
        *self.modified.lock().unwrap() = Some(modified);
        *self.body.lock().unwrap() = Some(Bytes::from_static(body));
    }

    /// Make both calls fail.
    pub fn go_offline(&self) {
        *self.modified.lock().unwrap() = None;
        *self.body.lock().unwrap() = None;
    }

    /// Timestamp still answers but downloads fail.
    pub fn break_downloads(&self) {
        *self.body.lock().unwrap() = None;
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn modified_calls(&self) -> usize {
        self.modified_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.modified_calls() + self.fetch_calls()
    }
}

#[async_trait]
impl RemoteSource for ScriptedRemote {
    async fn modified_at(&self, _url: &str) -> Result<DateTime<Utc>, RemoteError> {
        self.modified_calls.fetch_add(1, Ordering::SeqCst);
        let modified = *self.modified.lock().unwrap();
        modified.ok_or_else(|| RemoteError::Connect("connection refused".to_string()))
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let body = self.body.lock().unwrap().clone();
        body.ok_or_else(|| RemoteError::NotFound(url.to_string()))
    }
}
