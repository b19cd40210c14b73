//! Shape of a station document, read leniently.
//!
//! Readings arrive as numbers, numeric strings, `null` or the placeholder
//! `"-"`. Identifiers arrive as strings or numbers.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct StationDocument {
    pub observations: Observations,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Observations {
    #[serde(default)]
    pub notice: Vec<Notice>,
    #[serde(default)]
    pub header: Vec<Header>,
    #[serde(default)]
    pub data: Vec<Row>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Notice {
    #[serde(default, deserialize_with = "lenient_string")]
    pub copyright: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Header {
    #[serde(rename = "ID", default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub wmo_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Row {
    #[serde(default, deserialize_with = "lenient_number")]
    pub sort_order: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub aifstime_utc: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub aifstime_local: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub gust_kmh: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub wind_spd_kmh: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub air_temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub apparent_t: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rain_trace: Option<f64>,
}

impl Row {
    /// Rows without a sort order are never the latest.
    pub fn is_latest(&self) -> bool {
        self.sort_order.unwrap_or(1.0) == 0.0
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_readings_are_lenient() {
        let r = row(json!({
            "air_temp": 21.4,
            "apparent_t": "19.8",
            "rain_trace": "-",
            "gust_kmh": null,
            "wind_spd_kmh": "calm",
        }));
        assert_eq!(r.air_temp, Some(21.4));
        assert_eq!(r.apparent_t, Some(19.8));
        assert_eq!(r.rain_trace, None);
        assert_eq!(r.gust_kmh, None);
        assert_eq!(r.wind_spd_kmh, None);
        assert_eq!(r.lat, None);
    }

    #[test]
    fn test_sort_order() {
        assert!(row(json!({"sort_order": 0})).is_latest());
        assert!(row(json!({"sort_order": "0"})).is_latest());
        assert!(!row(json!({"sort_order": 1})).is_latest());
        assert!(!row(json!({})).is_latest());
    }

    #[test]
    fn test_header_ids_as_strings() {
        let header: Header = serde_json::from_value(json!({
            "ID": "066062",
            "wmo_id": 94768,
            "state": null,
        }))
        .unwrap();
        assert_eq!(header.id, "066062");
        assert_eq!(header.wmo_id, "94768");
        assert_eq!(header.state, "");
        assert_eq!(header.name, "");
    }
}
