//! Persistence for cached artifacts and their index files.
//!
//! [`LocalStore`] writes through a temporary sibling file and renames it into
//! place, so readers that skip the lock never see a partially written
//! artifact. [`MemoryStore`] keeps everything in a map for tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Storage for artifact blobs and index files.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Modification time of a file, or `None` if it does not exist.
    async fn modified_at(&self, path: &Path) -> io::Result<Option<DateTime<Utc>>>;

    /// Read a whole file.
    async fn read(&self, path: &Path) -> io::Result<Bytes>;

    /// Replace a file's contents atomically and stamp it with `modified_at`.
    async fn write_atomic(
        &self,
        path: &Path,
        contents: &[u8],
        modified_at: DateTime<Utc>,
    ) -> io::Result<()>;

    /// Set the modification time of an existing file.
    async fn touch(&self, path: &Path, at: DateTime<Utc>) -> io::Result<()>;

    /// Read a file that may be absent.
    async fn read_optional(&self, path: &Path) -> io::Result<Option<Bytes>> {
        match self.read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Filesystem-backed store.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStore;

impl LocalStore {
    fn temp_path(path: &Path) -> io::Result<PathBuf> {
        let parent = path.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "cache path has no parent")
        })?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("artifact");
        Ok(parent.join(format!(".{}.tmp.{}", name, std::process::id())))
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn modified_at(&self, path: &Path) -> io::Result<Option<DateTime<Utc>>> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(Some(DateTime::<Utc>::from(metadata.modified()?))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn read(&self, path: &Path) -> io::Result<Bytes> {
        fs::read(path).await.map(Bytes::from)
    }

    async fn write_atomic(
        &self,
        path: &Path,
        contents: &[u8],
        modified_at: DateTime<Utc>,
    ) -> io::Result<()> {
        let temp_path = Self::temp_path(path)?;
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&temp_path).await?;
        let written = async {
            file.write_all(contents).await?;
            file.flush().await?;
            let std_file = file.into_std().await;
            let stamp = SystemTime::from(modified_at);
            tokio::task::spawn_blocking(move || {
                std_file.set_modified(stamp)?;
                std_file.sync_all()
            })
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
        }
        .await;

        if let Err(e) = written {
            fs::remove_file(&temp_path).await.ok();
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            fs::remove_file(&temp_path).await.ok();
            return Err(e);
        }

        debug!(path = %path.display(), bytes = contents.len(), "Replaced cache file");
        Ok(())
    }

    async fn touch(&self, path: &Path, at: DateTime<Utc>) -> io::Result<()> {
        let path = path.to_path_buf();
        let stamp = SystemTime::from(at);
        tokio::task::spawn_blocking(move || {
            std::fs::OpenOptions::new()
                .write(true)
                .open(&path)?
                .set_modified(stamp)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Bytes,
    modified_at: DateTime<Utc>,
}

/// Operation counters for [`MemoryStore`].
#[derive(Debug, Default)]
pub struct StoreStats {
    pub metadata_reads: AtomicU64,
    pub reads: AtomicU64,
    pub writes: AtomicU64,
    pub touches: AtomicU64,
}

impl StoreStats {
    /// Count of every operation other than `modified_at`.
    pub fn data_operations(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
            + self.writes.load(Ordering::SeqCst)
            + self.touches.load(Ordering::SeqCst)
    }
}

/// In-memory store for tests and single-process builds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<PathBuf, MemoryFile>>,
    stats: StoreStats,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Seed a file directly, bypassing the counters.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Bytes>, modified_at: DateTime<Utc>) {
        self.files().insert(
            path.into(),
            MemoryFile {
                contents: contents.into(),
                modified_at,
            },
        );
    }

    /// Peek at a file without counting a read.
    pub fn contents(&self, path: &Path) -> Option<Bytes> {
        self.files().get(path).map(|f| f.contents.clone())
    }

    fn files(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, MemoryFile>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    )
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn modified_at(&self, path: &Path) -> io::Result<Option<DateTime<Utc>>> {
        self.stats.metadata_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.files().get(path).map(|f| f.modified_at))
    }

    async fn read(&self, path: &Path) -> io::Result<Bytes> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        self.files()
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| not_found(path))
    }

    async fn write_atomic(
        &self,
        path: &Path,
        contents: &[u8],
        modified_at: DateTime<Utc>,
    ) -> io::Result<()> {
        self.stats.writes.fetch_add(1, Ordering::SeqCst);
        self.files().insert(
            path.to_path_buf(),
            MemoryFile {
                contents: Bytes::copy_from_slice(contents),
                modified_at,
            },
        );
        Ok(())
    }

    async fn touch(&self, path: &Path, at: DateTime<Utc>) -> io::Result<()> {
        self.stats.touches.fetch_add(1, Ordering::SeqCst);
        match self.files().get_mut(path) {
            Some(file) => {
                file.modified_at = at;
                Ok(())
            }
            None => Err(not_found(path)),
        }
    }
}
