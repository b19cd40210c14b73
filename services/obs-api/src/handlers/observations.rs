//! Latest observations as GeoJSON.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use metrics::{counter, histogram};
use obs_common::{ObsError, WmoFilter};
use serde::Deserialize;
use tracing::info;

use super::{error_response, pretty_json_response};
use crate::aggregator::aggregate;
use crate::geojson::FeatureCollection;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ObservationsQuery {
    /// State code, product id, alias or `ALL`.
    pub state: Option<String>,
    pub wmo_id: Option<String>,
}

/// GET /observations?state=NSW&wmo_id=94768
pub async fn observations_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ObservationsQuery>,
) -> Response {
    let start = Instant::now();

    let selection = match state.config.sources.parse_selection(query.state.as_deref()) {
        Ok(selection) => selection,
        Err(e) => {
            counter!("obs_requests_total", "status" => "invalid").increment(1);
            return error_response(&e);
        }
    };
    let filter = query.wmo_id.as_deref().and_then(WmoFilter::parse);

    let aggregation = aggregate(&state, &selection, filter.as_ref()).await;
    let failed_sources = aggregation.failed_sources();
    let collection = FeatureCollection::from_records(aggregation.records);

    let body = match collection.to_pretty_json() {
        Ok(body) => body,
        Err(e) => return error_response(&ObsError::from(e)),
    };

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    counter!("obs_requests_total", "status" => "ok").increment(1);
    histogram!("obs_request_duration_ms", "endpoint" => "observations").record(elapsed_ms);
    info!(
        selection = ?selection,
        features = collection.features.len(),
        failed_sources,
        elapsed_ms,
        "Served observations"
    );

    pretty_json_response(body)
}
