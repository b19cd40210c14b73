//! Bundle decoding.

use std::io::Read;

use chrono::{DateTime, SecondsFormat, Utc};
use flate2::read::GzDecoder;
use obs_common::ObservationRecord;
use tracing::{debug, warn};

use crate::bom::StationDocument;
use crate::error::ArchiveError;

/// Result of decoding one bundle.
#[derive(Debug)]
pub enum DecodeOutcome {
    /// The whole archive was read. `records` may legitimately be empty.
    Decoded {
        records: Vec<ObservationRecord>,
        /// JSON members that were unreadable or had no data rows.
        skipped_members: usize,
    },
    /// The archive itself was unreadable. `records` holds whatever was
    /// decoded before the failure.
    Failed {
        error: ArchiveError,
        records: Vec<ObservationRecord>,
    },
}

impl DecodeOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DecodeOutcome::Failed { .. })
    }

    pub fn records(&self) -> &[ObservationRecord] {
        match self {
            DecodeOutcome::Decoded { records, .. } | DecodeOutcome::Failed { records, .. } => {
                records
            }
        }
    }

    /// Records usable by callers: nothing from a failed archive.
    pub fn into_records(self) -> Vec<ObservationRecord> {
        match self {
            DecodeOutcome::Decoded { records, .. } => records,
            DecodeOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// Turns artifact bytes into observation records.
///
/// Decoding is CPU-bound and synchronous; async callers should run it on a
/// blocking thread.
pub trait ArchiveDecoder: Send + Sync {
    /// Decode `bytes` fetched for `source`, stamping each record with
    /// `fetched_at`.
    fn decode(&self, source: &str, bytes: &[u8], fetched_at: DateTime<Utc>) -> DecodeOutcome;
}

/// Decoder for BOM `IDx60910.tgz` bundles.
#[derive(Debug, Default, Clone, Copy)]
pub struct BomArchiveDecoder;

impl BomArchiveDecoder {
    pub fn new() -> Self {
        Self
    }

    fn read_members(
        &self,
        source: &str,
        bytes: &[u8],
        last_fetched: &str,
        records: &mut Vec<ObservationRecord>,
    ) -> Result<usize, ArchiveError> {
        let mut archive = tar::Archive::new(GzDecoder::new(bytes));
        let mut skipped = 0;

        for entry in archive.entries().map_err(ArchiveError::Read)? {
            let mut entry = entry.map_err(ArchiveError::Read)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = entry
                .path()
                .map_err(ArchiveError::Read)?
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !name.ends_with(".json") {
                continue;
            }

            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .map_err(|source| ArchiveError::Member {
                    name: name.clone(),
                    source,
                })?;

            match decode_member(source, &contents, last_fetched) {
                Member::Record(record) => records.push(*record),
                Member::NoLatest => debug!(member = %name, "No latest reading in member"),
                Member::Unreadable => {
                    debug!(member = %name, "Skipping unreadable member");
                    skipped += 1;
                }
            }
        }

        Ok(skipped)
    }
}

impl ArchiveDecoder for BomArchiveDecoder {
    fn decode(&self, source: &str, bytes: &[u8], fetched_at: DateTime<Utc>) -> DecodeOutcome {
        let last_fetched = fetched_at.to_rfc3339_opts(SecondsFormat::Secs, false);
        let mut records = Vec::new();

        match self.read_members(source, bytes, &last_fetched, &mut records) {
            Ok(skipped_members) => {
                debug!(
                    source,
                    records = records.len(),
                    skipped_members,
                    "Decoded bundle"
                );
                DecodeOutcome::Decoded {
                    records,
                    skipped_members,
                }
            }
            Err(error) => {
                warn!(source, error = %error, partial = records.len(), "Failed to decode bundle");
                DecodeOutcome::Failed { error, records }
            }
        }
    }
}

enum Member {
    Record(Box<ObservationRecord>),
    NoLatest,
    /// Invalid JSON or no data rows.
    Unreadable,
}

fn decode_member(source: &str, contents: &[u8], last_fetched: &str) -> Member {
    let Ok(document) = serde_json::from_slice::<StationDocument>(contents) else {
        return Member::Unreadable;
    };
    let observations = document.observations;
    if observations.data.is_empty() {
        return Member::Unreadable;
    }

    let header = observations.header.into_iter().next().unwrap_or_default();
    let copyright = observations
        .notice
        .into_iter()
        .next()
        .map(|n| n.copyright)
        .unwrap_or_default();

    let Some(row) = observations.data.into_iter().find(|row| row.is_latest()) else {
        return Member::NoLatest;
    };

    Member::Record(Box::new(ObservationRecord {
        state_abbrev: source.to_string(),
        state: header.state,
        copyright,
        id: header.id,
        name: header.name,
        wmo_id: header.wmo_id,
        aifstime_utc: row.aifstime_utc,
        aifstime_local: row.aifstime_local,
        lat: row.lat.unwrap_or(0.0),
        lon: row.lon.unwrap_or(0.0),
        gust_kmh: row.gust_kmh,
        wind_kmh: row.wind_spd_kmh,
        air_temp: row.air_temp,
        apparent_t: row.apparent_t,
        rain_since_9am: row.rain_trace,
        last_fetched: last_fetched.to_string(),
    }))
}
