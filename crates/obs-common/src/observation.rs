//! The decoded observation record and station filtering.

use serde::{Deserialize, Serialize};

/// Latest reading for one weather station.
///
/// Field names match the published JSON properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Source identifier the record was decoded from (e.g. "NSW").
    pub state_abbrev: String,
    /// State name as reported by the bundle header.
    pub state: String,
    pub copyright: String,
    /// Bureau station id.
    pub id: String,
    pub name: String,
    /// WMO station number, as a string of digits.
    pub wmo_id: String,
    pub aifstime_utc: String,
    pub aifstime_local: String,
    pub lat: f64,
    pub lon: f64,
    pub gust_kmh: Option<f64>,
    pub wind_kmh: Option<f64>,
    pub air_temp: Option<f64>,
    pub apparent_t: Option<f64>,
    pub rain_since_9am: Option<f64>,
    /// RFC 3339 time the cached bundle was last refreshed.
    pub last_fetched: String,
}

/// Exact-match filter on the WMO station number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmoFilter(String);

impl WmoFilter {
    /// Build a filter from a raw query value, keeping digits only.
    ///
    /// Returns `None` when nothing remains after stripping.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            None
        } else {
            Some(Self(digits))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, record: &ObservationRecord) -> bool {
        record.wmo_id == self.0
    }
}
