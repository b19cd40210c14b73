//! On-disk layout of cache entries.
//!
//! Per source, three files live side by side in the cache directory:
//!
//! ```text
//! <dir>/IDN60910.tgz        artifact
//! <dir>/IDN60910.tgz.index  last remote timestamp fetched (decimal Unix seconds)
//! <dir>/IDN60910.lock       lock file
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Paths and remote location for one cached source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Stable source identifier (e.g. "NSW").
    pub key: String,
    /// Remote location of the artifact.
    pub url: String,
    pub artifact_path: PathBuf,
    pub index_path: PathBuf,
    /// Name handed to the [`crate::LockProvider`].
    pub lock_name: String,
}

/// Cached state of an entry, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub artifact_modified_at: Option<DateTime<Utc>>,
    pub last_seen_remote: Option<i64>,
}

/// Builds [`CacheEntry`] values rooted at one cache directory.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    dir: PathBuf,
}

impl CacheLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Entry for `file_name` (e.g. "IDN60910.tgz") fetched from `url`.
    pub fn entry(&self, key: impl Into<String>, file_name: &str, url: impl Into<String>) -> CacheEntry {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string();

        CacheEntry {
            key: key.into(),
            url: url.into(),
            artifact_path: self.dir.join(file_name),
            index_path: self.dir.join(format!("{}.index", file_name)),
            lock_name: stem,
        }
    }
}

/// Parse index file contents. Anything unparsable counts as never fetched.
pub(crate) fn parse_index(contents: &[u8]) -> Option<i64> {
    std::str::from_utf8(contents).ok()?.trim().parse().ok()
}

pub(crate) fn render_index(timestamp: i64) -> String {
    timestamp.to_string()
}
