//! Latest observations service.
//!
//! Serves the latest reading of every BOM weather station as a GeoJSON
//! FeatureCollection, backed by a TTL cache of the state bundles.

pub mod aggregator;
pub mod config;
pub mod geojson;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the HTTP router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Observations
        .route("/", get(handlers::observations::observations_handler))
        .route(
            "/observations",
            get(handlers::observations::observations_handler),
        )
        // Source status
        .route("/sources", get(handlers::sources::sources_handler))
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
