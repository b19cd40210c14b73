//! Application state for the observations API.

use std::sync::Arc;

use anyhow::{Context, Result};
use freshness_cache::{
    CacheEntry, CacheLayout, FileLockProvider, FreshnessCache, LockProvider, RemoteSource,
};
use metrics_exporter_prometheus::PrometheusHandle;
use obs_archive::{ArchiveDecoder, BomArchiveDecoder};
use obs_common::SourceDef;
use source_client::RemoteClient;

use crate::config::ObsConfig;

/// Shared application state.
pub struct AppState {
    pub config: ObsConfig,

    /// TTL cache of the state bundles.
    pub cache: FreshnessCache,

    /// File locations inside the cache directory.
    pub layout: CacheLayout,

    pub decoder: Arc<dyn ArchiveDecoder>,

    /// Recorder handle rendered at `/metrics`, when one is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// State backed by the real remote and cross-process file locks.
    pub fn new(config: ObsConfig) -> Result<Self> {
        let remote = RemoteClient::for_base_url(&config.base_url, config.connect_timeout)
            .with_context(|| format!("Failed to create remote client for {}", config.base_url))?;
        let locks = Arc::new(FileLockProvider::new(&config.cache_dir));
        Ok(Self::with_parts(config, Arc::new(remote), locks))
    }

    /// State with an explicit remote and lock provider.
    pub fn with_parts(
        config: ObsConfig,
        remote: Arc<dyn RemoteSource>,
        locks: Arc<dyn LockProvider>,
    ) -> Self {
        let cache = FreshnessCache::new(config.cache_ttl, remote, locks);
        let layout = CacheLayout::new(&config.cache_dir);

        Self {
            config,
            cache,
            layout,
            decoder: Arc::new(BomArchiveDecoder::new()),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Cache entry for a configured source.
    pub fn entry_for(&self, source: &SourceDef) -> CacheEntry {
        self.layout.entry(
            source.code.clone(),
            &source.file_name(),
            self.config.source_url(source),
        )
    }
}
