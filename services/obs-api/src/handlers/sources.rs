//! Remote and cached timestamps per source.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::Extension, Json};
use chrono::{DateTime, SecondsFormat, Utc};
use freshness_cache::RemoteSource;
use futures::future::join_all;
use metrics::histogram;
use obs_common::SourceDef;
use serde::Serialize;
use tracing::debug;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub sources: Vec<SourceStatusEntry>,
}

#[derive(Debug, Serialize)]
pub struct SourceStatusEntry {
    pub state: String,
    pub product_id: String,
    pub filename: String,
    pub url: String,
    /// Live modification time on the remote; `None` when it cannot be read.
    pub remote_modified: Option<String>,
    /// Local modification time of the cached bundle.
    pub cached_modified: Option<String>,
    /// Remote timestamp of the last download.
    pub last_seen_remote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /sources
pub async fn sources_handler(Extension(state): Extension<Arc<AppState>>) -> Json<SourcesResponse> {
    let start = Instant::now();
    let sources = join_all(
        state
            .config
            .sources
            .sources
            .iter()
            .map(|source| source_status(&state, source)),
    )
    .await;

    histogram!("obs_request_duration_ms", "endpoint" => "sources")
        .record(start.elapsed().as_secs_f64() * 1000.0);
    Json(SourcesResponse { sources })
}

async fn source_status(state: &AppState, source: &SourceDef) -> SourceStatusEntry {
    let entry = state.entry_for(source);
    let mut error = None;

    let remote_modified = match state.cache.remote().modified_at(&entry.url).await {
        Ok(ts) => Some(format_time(ts)),
        Err(e) => {
            debug!(source = %source.code, error = %e, "Remote timestamp unavailable");
            error = Some(e.to_string());
            None
        }
    };

    let (cached_modified, last_seen_remote) = match state.cache.snapshot(&entry).await {
        Ok(snapshot) => (
            snapshot.artifact_modified_at.map(format_time),
            snapshot
                .last_seen_remote
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .map(format_time),
        ),
        Err(e) => {
            error.get_or_insert_with(|| e.to_string());
            (None, None)
        }
    };

    SourceStatusEntry {
        state: source.code.clone(),
        product_id: source.product_id.clone(),
        filename: source.file_name(),
        url: entry.url,
        remote_modified,
        cached_modified,
        last_seen_remote,
        error,
    }
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}
