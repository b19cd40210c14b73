//! Shared setup for obs-api integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use freshness_cache::FileLockProvider;
use obs_api::config::ObsConfig;
use obs_api::state::AppState;
use obs_common::{SourceDef, SourceTable};
use tempfile::TempDir;
use test_utils::{temp_cache_dir, StaticRemote, Station, TgzBuilder};
use tower::ServiceExt;

pub const BASE_URL: &str = "ftp://bom.test/anon/gen/fwo/";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub remote: Arc<StaticRemote>,
    pub dir: TempDir,
}

impl TestApp {
    /// NSW and VIC sources with nothing published yet.
    pub fn new() -> Self {
        let dir = temp_cache_dir();
        let mut sources = SourceTable::default();
        sources.sources = vec![
            SourceDef::new("NSW", "IDN60910"),
            SourceDef::new("VIC", "IDV60910"),
        ];

        let config = ObsConfig {
            cache_dir: dir.path().to_path_buf(),
            cache_ttl: Duration::from_secs(180),
            base_url: BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(1),
            sources,
        };

        let remote = Arc::new(StaticRemote::new());
        let locks = Arc::new(FileLockProvider::new(dir.path()));
        let state = Arc::new(AppState::with_parts(config, remote.clone(), locks));

        Self { state, remote, dir }
    }

    /// App with the standard NSW and VIC bundles published.
    pub fn with_bundles() -> Self {
        let app = Self::new();
        app.publish("IDN60910", nsw_bundle());
        app.publish("IDV60910", vic_bundle());
        app
    }

    pub fn publish(&self, product: &str, bundle: Vec<u8>) {
        let url = format!("{}{}.tgz", BASE_URL, product);
        let modified = Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap();
        self.remote.publish(&url, modified, bundle);
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let response = obs_api::build_router(self.state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = self.get(uri).await;
        (status, serde_json::from_str(&body).unwrap())
    }
}

/// NSW bundle: Sydney Observatory Hill (94768) and Canberra (94926).
pub fn nsw_bundle() -> Vec<u8> {
    TgzBuilder::new()
        .station(
            "IDN60910",
            &Station::new("066062", "Sydney - Observatory Hill", 94768).at(-33.8607, 151.2050),
        )
        .station(
            "IDN60910",
            &Station::new("070351", "Canberra", 94926)
                .state("Australian Capital Territory")
                .at(-35.3088, 149.2004),
        )
        .build()
}

/// VIC bundle: a single station (94767).
pub fn vic_bundle() -> Vec<u8> {
    TgzBuilder::new()
        .station(
            "IDV60910",
            &Station::new("086282", "Melbourne Airport", 94767)
                .state("Victoria")
                .at(-37.6655, 144.8321),
        )
        .build()
}

/// Values of a property across all features.
pub fn feature_values(collection: &serde_json::Value, property: &str) -> Vec<String> {
    collection["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["properties"][property].as_str().unwrap_or_default().to_string())
        .collect()
}
