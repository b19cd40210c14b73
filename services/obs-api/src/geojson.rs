//! GeoJSON output types.

use obs_common::ObservationRecord;
use serde::{Deserialize, Serialize};

/// A GeoJSON FeatureCollection of station observations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features: Vec::new(),
        }
    }

    /// One point feature per record, in record order.
    pub fn from_records(records: Vec<ObservationRecord>) -> Self {
        Self {
            features: records.into_iter().map(Feature::from_record).collect(),
            ..Self::new()
        }
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// A station as a GeoJSON Feature; the record is carried whole as
/// `properties`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub geometry: Geometry,

    pub properties: ObservationRecord,
}

impl Feature {
    pub fn from_record(record: ObservationRecord) -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry: Geometry::point(record.lon, record.lat),
            properties: record,
        }
    }
}

/// GeoJSON geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        /// Coordinates as [longitude, latitude].
        coordinates: [f64; 2],
    },
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: [lon, lat],
        }
    }
}
