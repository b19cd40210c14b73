//! Scoped exclusive locks over named resources.
//!
//! A [`LockGuard`] releases its lock when dropped, so every exit path of a
//! refresh (including errors and panics) gives the lock back.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fs2::FileExt;
use tracing::{debug, trace};

use crate::error::LockError;

/// Held lock. Dropping it releases the lock.
pub struct LockGuard {
    name: String,
    _held: Box<dyn Send + Sync>,
}

impl LockGuard {
    pub fn new(name: impl Into<String>, held: impl Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            _held: Box::new(held),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        trace!(lock = %self.name, "Released lock");
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("name", &self.name).finish()
    }
}

/// Exclusive acquisition of a named lock. Acquisition waits for the holder.
#[async_trait]
pub trait LockProvider: Send + Sync {
    async fn acquire(&self, name: &str) -> Result<LockGuard, LockError>;
}

/// Advisory file locks (`flock`) on `<dir>/<name>.lock`.
///
/// Works across processes sharing the directory, and between tasks of one
/// process since each acquisition opens its own file description.
#[derive(Debug, Clone)]
pub struct FileLockProvider {
    dir: PathBuf,
}

impl FileLockProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", name))
    }
}

/// Open lock file holding an exclusive lock.
struct HeldFileLock {
    file: File,
    path: PathBuf,
}

impl Drop for HeldFileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(path = %self.path.display(), error = %e, "Unlock failed, closing file instead");
        }
    }
}

fn lock_file(path: &Path) -> Result<File, LockError> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| LockError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    file.lock_exclusive().map_err(|source| LockError::Acquire {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(file)
}

#[async_trait]
impl LockProvider for FileLockProvider {
    async fn acquire(&self, name: &str) -> Result<LockGuard, LockError> {
        let path = self.lock_path(name);
        let blocking_path = path.clone();

        // flock blocks the calling thread until the holder lets go.
        let file = tokio::task::spawn_blocking(move || lock_file(&blocking_path))
            .await
            .map_err(|e| LockError::Task(e.to_string()))??;

        debug!(lock = %name, path = %path.display(), "Acquired file lock");
        Ok(LockGuard::new(name, HeldFileLock { file, path }))
    }
}

/// Per-name async mutexes for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryLockProvider {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MemoryLockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl LockProvider for MemoryLockProvider {
    async fn acquire(&self, name: &str) -> Result<LockGuard, LockError> {
        let guard = self.mutex_for(name).lock_owned().await;
        Ok(LockGuard::new(name, guard))
    }
}
