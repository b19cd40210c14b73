//! Local TTL cache for periodically republished remote artifacts.
//!
//! One artifact file is cached per source. A lookup inside the TTL window
//! touches nothing but the artifact's modification time. Once the window
//! expires, a single caller per source (across tasks and processes) takes
//! the source's lock, asks the remote for its modification time, and only
//! downloads when that timestamp is newer than the one recorded in the
//! source's index file. Remote failures degrade to serving the last good
//! copy.
//!
//! All side effects go through injected capabilities so the refresh logic
//! can be driven deterministically in tests:
//!
//! - [`Clock`]: current time ([`SystemClock`], [`ManualClock`])
//! - [`ArtifactStore`]: artifact/index persistence ([`LocalStore`], [`MemoryStore`])
//! - [`LockProvider`]: per-source exclusive lock ([`FileLockProvider`], [`MemoryLockProvider`])
//! - [`RemoteSource`]: remote modification time and bytes
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use freshness_cache::{CacheLayout, FileLockProvider, FreshnessCache};
//!
//! let layout = CacheLayout::new("/var/cache/obs");
//! let cache = FreshnessCache::new(
//!     Duration::from_secs(180),
//!     remote,
//!     Arc::new(FileLockProvider::new(layout.dir())),
//! );
//! let entry = layout.entry("NSW", "IDN60910.tgz", "ftp://ftp.bom.gov.au/anon/gen/fwo/IDN60910.tgz");
//! let artifact = cache.resolve(&entry).await?;
//! ```

pub mod cache;
pub mod clock;
pub mod entry;
pub mod error;
pub mod lock;
pub mod remote;
pub mod store;

pub use cache::{FreshnessCache, RefreshOutcome, ResolvedArtifact};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CacheLayout, EntrySnapshot};
pub use error::{CacheError, LockError, RemoteError};
pub use lock::{FileLockProvider, LockGuard, LockProvider, MemoryLockProvider};
pub use remote::RemoteSource;
pub use store::{ArtifactStore, LocalStore, MemoryStore, StoreStats};
