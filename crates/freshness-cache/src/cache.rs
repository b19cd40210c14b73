//! TTL-gated refresh of cached artifacts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, info, instrument, warn, Instrument, Span};

use crate::clock::{Clock, SystemClock};
use crate::entry::{parse_index, render_index, CacheEntry, EntrySnapshot};
use crate::error::{CacheError, RemoteError};
use crate::lock::LockProvider;
use crate::remote::RemoteSource;
use crate::store::{ArtifactStore, LocalStore};

/// How a resolved artifact came to be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Inside the TTL window; nothing but the mtime was read.
    Fresh,
    /// Another caller refreshed the entry while this one waited for the lock.
    RefreshedByPeer,
    /// The remote had a newer artifact (or nothing was cached) and it was downloaded.
    Downloaded,
    /// The remote timestamp was not newer; the TTL window was restarted.
    Unchanged,
    /// The remote timestamp could not be read; serving the cached copy.
    StaleRemoteUnavailable,
    /// The download failed; serving the cached copy.
    StaleFetchFailed,
}

impl RefreshOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshOutcome::Fresh => "fresh",
            RefreshOutcome::RefreshedByPeer => "refreshed_by_peer",
            RefreshOutcome::Downloaded => "downloaded",
            RefreshOutcome::Unchanged => "unchanged",
            RefreshOutcome::StaleRemoteUnavailable => "stale_remote_unavailable",
            RefreshOutcome::StaleFetchFailed => "stale_fetch_failed",
        }
    }

    /// True when the served copy may be older than the remote's.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            RefreshOutcome::StaleRemoteUnavailable | RefreshOutcome::StaleFetchFailed
        )
    }
}

/// A local artifact that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub key: String,
    pub path: PathBuf,
    /// Local modification time after resolution.
    pub modified_at: DateTime<Utc>,
    pub outcome: RefreshOutcome,
}

/// Keeps one local copy per remote artifact fresh within a TTL.
///
/// Clones share the same clock, store, locks and remote.
#[derive(Clone)]
pub struct FreshnessCache {
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    store: Arc<dyn ArtifactStore>,
    locks: Arc<dyn LockProvider>,
    remote: Arc<dyn RemoteSource>,
}

impl FreshnessCache {
    /// Create a cache using the wall clock and the local filesystem.
    pub fn new(ttl: Duration, remote: Arc<dyn RemoteSource>, locks: Arc<dyn LockProvider>) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock: Arc::new(SystemClock),
            store: Arc::new(LocalStore),
            locks,
            remote,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn remote(&self) -> &Arc<dyn RemoteSource> {
        &self.remote
    }

    /// Return a local copy of the entry's artifact, refreshing it from the
    /// remote once the TTL has expired.
    ///
    /// Fails only when the lock cannot be taken, local files cannot be
    /// written, or nothing is cached and the remote cannot supply it.
    #[instrument(skip(self, entry), fields(source = %entry.key))]
    pub async fn resolve(&self, entry: &CacheEntry) -> Result<ResolvedArtifact, CacheError> {
        let result = self.resolve_inner(entry).await;
        if let Err(e) = &result {
            counter!("obs_cache_resolve_total", "outcome" => e.kind()).increment(1);
        }
        result
    }

    async fn resolve_inner(&self, entry: &CacheEntry) -> Result<ResolvedArtifact, CacheError> {
        let now = self.clock.now();
        if let Some(modified_at) = self.artifact_modified_at(entry).await? {
            if self.is_fresh(modified_at, now) {
                return Ok(self.finish(entry, modified_at, RefreshOutcome::Fresh));
            }
        }

        let guard = self
            .locks
            .acquire(&entry.lock_name)
            .await
            .map_err(|source| CacheError::Lock {
                key: entry.key.clone(),
                source,
            })?;

        // The task owns the guard; dropping the caller neither aborts the
        // refresh nor releases the lock.
        let cache = self.clone();
        let owned = entry.clone();
        let refresh = tokio::spawn(
            async move {
                let result = cache.refresh_locked(&owned).await;
                drop(guard);
                result
            }
            .instrument(Span::current()),
        );

        refresh.await.map_err(|e| CacheError::Task {
            key: entry.key.clone(),
            reason: e.to_string(),
        })?
    }

    /// Current cached state without touching the remote.
    pub async fn snapshot(&self, entry: &CacheEntry) -> Result<EntrySnapshot, CacheError> {
        Ok(EntrySnapshot {
            artifact_modified_at: self.artifact_modified_at(entry).await?,
            last_seen_remote: self.last_seen_remote(entry).await?,
        })
    }

    async fn refresh_locked(&self, entry: &CacheEntry) -> Result<ResolvedArtifact, CacheError> {
        let now = self.clock.now();
        let existing = self.artifact_modified_at(entry).await?;

        if let Some(modified_at) = existing {
            if self.is_fresh(modified_at, now) {
                debug!("Entry refreshed while waiting for lock");
                return Ok(self.finish(entry, modified_at, RefreshOutcome::RefreshedByPeer));
            }
        }

        let remote_modified = match self.remote.modified_at(&entry.url).await {
            Ok(ts) => ts,
            Err(e) => {
                return self
                    .degrade(entry, existing, e, RefreshOutcome::StaleRemoteUnavailable)
                    .await;
            }
        };

        let last_seen = self.last_seen_remote(entry).await?.unwrap_or(0);
        let remote_ts = remote_modified.timestamp();
        let is_newer = remote_ts > last_seen;

        if !is_newer && existing.is_some() {
            debug!(remote_ts, last_seen, "Remote unchanged");
            let touched_at = self.clock.now();
            self.touch(entry, touched_at).await;
            return Ok(self.finish(entry, touched_at, RefreshOutcome::Unchanged));
        }

        // Reaching here without a cached copy always downloads, even when the
        // recorded timestamp is already current.
        let bytes = match self.remote.fetch(&entry.url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return self
                    .degrade(entry, existing, e, RefreshOutcome::StaleFetchFailed)
                    .await;
            }
        };

        // Stamp with the time the bytes landed, not when the refresh began.
        let written_at = self.clock.now();
        if let Err(e) = self
            .store
            .write_atomic(&entry.artifact_path, &bytes, written_at)
            .await
        {
            if existing.is_none() {
                return Err(CacheError::store(&entry.artifact_path, e));
            }
            warn!(
                path = %entry.artifact_path.display(),
                error = %e,
                "Failed to replace artifact, serving cached copy"
            );
            self.touch(entry, written_at).await;
            return Ok(self.finish(entry, written_at, RefreshOutcome::StaleFetchFailed));
        }

        if is_newer {
            // A missed index write only causes one redundant download later.
            if let Err(e) = self
                .store
                .write_atomic(&entry.index_path, render_index(remote_ts).as_bytes(), written_at)
                .await
            {
                warn!(path = %entry.index_path.display(), error = %e, "Failed to record remote timestamp");
            }
        }

        counter!("obs_remote_fetch_bytes_total").increment(bytes.len() as u64);
        info!(
            bytes = bytes.len(),
            remote_modified = %remote_modified,
            previous = last_seen,
            "Downloaded artifact"
        );

        Ok(self.finish(entry, written_at, RefreshOutcome::Downloaded))
    }

    /// Serve the cached copy after a remote failure, or fail if there is none.
    async fn degrade(
        &self,
        entry: &CacheEntry,
        existing: Option<DateTime<Utc>>,
        error: RemoteError,
        outcome: RefreshOutcome,
    ) -> Result<ResolvedArtifact, CacheError> {
        match existing {
            Some(_) => {
                warn!(error = %error, outcome = outcome.as_str(), "Remote failed, serving cached artifact");
                let touched_at = self.clock.now();
                self.touch(entry, touched_at).await;
                Ok(self.finish(entry, touched_at, outcome))
            }
            None => {
                warn!(error = %error, "Remote failed and nothing is cached");
                Err(CacheError::Unavailable {
                    key: entry.key.clone(),
                    source: error,
                })
            }
        }
    }

    /// Restart the TTL window. A failed touch only means an earlier retry.
    async fn touch(&self, entry: &CacheEntry, now: DateTime<Utc>) {
        if let Err(e) = self.store.touch(&entry.artifact_path, now).await {
            warn!(path = %entry.artifact_path.display(), error = %e, "Failed to touch artifact");
        }
    }

    fn finish(
        &self,
        entry: &CacheEntry,
        modified_at: DateTime<Utc>,
        outcome: RefreshOutcome,
    ) -> ResolvedArtifact {
        counter!("obs_cache_resolve_total", "outcome" => outcome.as_str()).increment(1);
        ResolvedArtifact {
            key: entry.key.clone(),
            path: entry.artifact_path.clone(),
            modified_at,
            outcome,
        }
    }

    fn is_fresh(&self, modified_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(modified_at) < self.ttl
    }

    async fn artifact_modified_at(
        &self,
        entry: &CacheEntry,
    ) -> Result<Option<DateTime<Utc>>, CacheError> {
        self.store
            .modified_at(&entry.artifact_path)
            .await
            .map_err(|e| CacheError::store(&entry.artifact_path, e))
    }

    async fn last_seen_remote(&self, entry: &CacheEntry) -> Result<Option<i64>, CacheError> {
        let contents = self
            .store
            .read_optional(&entry.index_path)
            .await
            .map_err(|e| CacheError::store(&entry.index_path, e))?;
        Ok(contents.and_then(|c| parse_index(&c)))
    }
}
