//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use obs_common::{SourceDef, SourceTable};

pub const DEFAULT_BASE_URL: &str = "ftp://ftp.bom.gov.au/anon/gen/fwo/";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 180;

/// Settings shared by the cache, the remote client and the handlers.
#[derive(Debug, Clone)]
pub struct ObsConfig {
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    /// Directory URL the bundles are published under.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub sources: SourceTable,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: source_client::DEFAULT_CONNECT_TIMEOUT,
            sources: SourceTable::default(),
        }
    }
}

impl ObsConfig {
    /// Remote URL of a source's bundle.
    pub fn source_url(&self, source: &SourceDef) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, source.file_name())
        } else {
            format!("{}/{}", self.base_url, source.file_name())
        }
    }
}

/// Load the source table from a YAML file, or the built-in table if no
/// file is given.
pub fn load_source_table(path: Option<&Path>) -> Result<SourceTable> {
    let Some(path) = path else {
        return Ok(SourceTable::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file: {:?}", path))?;
    let table: SourceTable = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse sources file: {:?}", path))?;
    table
        .validate()
        .with_context(|| format!("Invalid sources file: {:?}", path))?;

    tracing::info!("Loaded {} sources from {:?}", table.sources.len(), path);
    Ok(table)
}

/// Create the cache directory if it is missing.
pub fn prepare_cache_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create cache directory: {:?}", dir))?;
    Ok(())
}
