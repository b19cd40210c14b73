//! Error types for cache resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a remote source.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("remote request timed out")]
    Timeout,

    #[error("remote file not found: {0}")]
    NotFound(String),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures acquiring a per-source lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to open lock file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock {}: {source}", .path.display())]
    Acquire {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lock task failed: {0}")]
    Task(String),
}

/// Errors returned by [`crate::FreshnessCache::resolve`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// The per-source lock could not be taken. Not retried.
    #[error("failed to lock source {key}: {source}")]
    Lock {
        key: String,
        #[source]
        source: LockError,
    },

    /// Nothing is cached and the remote could not supply the artifact.
    #[error("no cached artifact for {key} and the remote is unavailable: {source}")]
    Unavailable {
        key: String,
        #[source]
        source: RemoteError,
    },

    /// Reading or writing local cache files failed.
    #[error("cache store error at {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The detached refresh task panicked or was cancelled by the runtime.
    #[error("refresh task for {key} failed: {reason}")]
    Task { key: String, reason: String },
}

impl CacheError {
    pub(crate) fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Store {
            path: path.into(),
            source,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Lock { .. } => "lock",
            CacheError::Unavailable { .. } => "unavailable",
            CacheError::Store { .. } => "store",
            CacheError::Task { .. } => "task",
        }
    }
}
