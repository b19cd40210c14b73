//! Merges the latest observations across sources.
//!
//! Sources are resolved concurrently. A source whose bundle cannot be
//! resolved or decoded is skipped; the rest still answer.

use std::sync::Arc;

use freshness_cache::{ArtifactStore, RefreshOutcome};
use futures::future::join_all;
use obs_archive::DecodeOutcome;
use obs_common::{ObservationRecord, RegionSelection, SourceDef, WmoFilter};
use tracing::{debug, info, instrument, warn};

use crate::state::AppState;

/// What happened to one source during aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceStatus {
    Resolved {
        outcome: RefreshOutcome,
        records: usize,
    },
    /// The bundle could not be resolved or read.
    Skipped { reason: String },
    /// The bundle was resolved but could not be decoded.
    DecodeFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub code: String,
    pub status: SourceStatus,
}

/// Merged records plus a report per requested source.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub records: Vec<ObservationRecord>,
    pub reports: Vec<SourceReport>,
}

impl Aggregation {
    /// Sources that contributed nothing because of an error.
    pub fn failed_sources(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| !matches!(r.status, SourceStatus::Resolved { .. }))
            .count()
    }
}

/// Collect the latest records for the selected sources, optionally keeping
/// only one station.
#[instrument(skip(state, filter), fields(wmo_id = filter.map(|f| f.as_str())))]
pub async fn aggregate(
    state: &Arc<AppState>,
    selection: &RegionSelection,
    filter: Option<&WmoFilter>,
) -> Aggregation {
    let sources = state.config.sources.select(selection);
    let results = join_all(sources.into_iter().map(|source| load_source(state, source))).await;

    let mut aggregation = Aggregation::default();
    for (report, records) in results {
        aggregation.reports.push(report);
        aggregation.records.extend(records);
    }

    if let Some(filter) = filter {
        aggregation.records.retain(|record| filter.matches(record));
    }

    debug!(
        records = aggregation.records.len(),
        failed_sources = aggregation.failed_sources(),
        "Aggregated observations"
    );
    aggregation
}

/// Resolve every configured source once, discarding the records.
pub async fn warm(state: &Arc<AppState>) {
    let aggregation = aggregate(state, &RegionSelection::All, None).await;
    info!(
        records = aggregation.records.len(),
        failed_sources = aggregation.failed_sources(),
        "Cache warm-up complete"
    );
}

async fn load_source(
    state: &Arc<AppState>,
    source: &SourceDef,
) -> (SourceReport, Vec<ObservationRecord>) {
    let report = |status| SourceReport {
        code: source.code.clone(),
        status,
    };

    let entry = state.entry_for(source);
    let resolved = match state.cache.resolve(&entry).await {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(source = %source.code, error = %e, "Skipping source");
            return (report(SourceStatus::Skipped { reason: e.to_string() }), Vec::new());
        }
    };

    let bytes = match state.cache.store().read(&resolved.path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(source = %source.code, path = %resolved.path.display(), error = %e, "Failed to read cached bundle");
            return (report(SourceStatus::Skipped { reason: e.to_string() }), Vec::new());
        }
    };

    let decoder = state.decoder.clone();
    let code = source.code.clone();
    let fetched_at = resolved.modified_at;
    let decoded =
        tokio::task::spawn_blocking(move || decoder.decode(&code, &bytes, fetched_at)).await;

    match decoded {
        Ok(DecodeOutcome::Decoded { records, .. }) => (
            report(SourceStatus::Resolved {
                outcome: resolved.outcome,
                records: records.len(),
            }),
            records,
        ),
        Ok(DecodeOutcome::Failed { error, .. }) => (
            report(SourceStatus::DecodeFailed {
                reason: error.to_string(),
            }),
            Vec::new(),
        ),
        Err(e) => {
            warn!(source = %source.code, error = %e, "Decode task failed");
            (
                report(SourceStatus::DecodeFailed {
                    reason: e.to_string(),
                }),
                Vec::new(),
            )
        }
    }
}
