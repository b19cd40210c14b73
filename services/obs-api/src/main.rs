//! Observations API Server
//!
//! Latest BOM weather station observations as GeoJSON.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use obs_api::aggregator;
use obs_api::config::{self, ObsConfig, DEFAULT_BASE_URL, DEFAULT_CACHE_TTL_SECS};
use obs_api::state::AppState;

/// Observations API Server
#[derive(Parser, Debug)]
#[command(name = "obs-api")]
#[command(about = "Latest BOM weather observations served as GeoJSON")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "OBS_LISTEN_ADDR")]
    listen: String,

    /// Directory holding cached bundles, index files and lock files
    #[arg(long, default_value = "./cache", env = "OBS_CACHE_DIR")]
    cache_dir: PathBuf,

    /// Seconds a cached bundle is served without checking the remote
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS, env = "OBS_CACHE_TTL_SECS")]
    cache_ttl_secs: u64,

    /// Directory URL the bundles are published under (ftp, http or https)
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "OBS_BASE_URL")]
    base_url: String,

    /// Remote connection timeout in seconds
    #[arg(long, default_value_t = 10, env = "OBS_CONNECT_TIMEOUT_SECS")]
    connect_timeout_secs: u64,

    /// YAML file replacing the built-in source table
    #[arg(long, env = "OBS_SOURCES_FILE")]
    sources_file: Option<PathBuf>,

    /// Resolve every source once at startup
    #[arg(long, env = "OBS_WARM_ON_START")]
    warm_on_start: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    if let Err(e) = run_server(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run_server(args: Args) -> anyhow::Result<()> {
    info!("Starting observations API server");

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()?;

    let config = ObsConfig {
        cache_dir: args.cache_dir,
        cache_ttl: Duration::from_secs(args.cache_ttl_secs),
        base_url: args.base_url,
        connect_timeout: Duration::from_secs(args.connect_timeout_secs),
        sources: config::load_source_table(args.sources_file.as_deref())?,
    };

    config::prepare_cache_dir(&config.cache_dir)?;
    info!(
        cache_dir = %config.cache_dir.display(),
        ttl_secs = args.cache_ttl_secs,
        base_url = %config.base_url,
        sources = config.sources.sources.len(),
        "Cache configured"
    );

    let state = Arc::new(AppState::new(config)?.with_prometheus(prometheus_handle));

    if args.warm_on_start {
        let state = state.clone();
        tokio::spawn(async move {
            aggregator::warm(&state).await;
        });
    }

    let app = obs_api::build_router(state);

    // Parse listen address
    let addr: SocketAddr = args.listen.parse()?;

    info!("Observations API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
