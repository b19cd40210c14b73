//! Station documents shaped like the BOM `IDx60910` JSON members.

use serde_json::{json, Map, Value};

pub const COPYRIGHT: &str = "Copyright Commonwealth of Australia 2024, Bureau of Meteorology (ABN 92 637 533 532)";

/// One station's JSON document: a header plus a latest and an older row.
#[derive(Debug, Clone)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub state: String,
    pub wmo_id: Value,
    pub lat: f64,
    pub lon: f64,
    latest: Map<String, Value>,
}

impl Station {
    pub fn new(id: &str, name: &str, wmo_id: impl Into<Value>) -> Self {
        let mut latest = Map::new();
        latest.insert("aifstime_utc".into(), json!("20240301050000"));
        latest.insert("aifstime_local".into(), json!("20240301160000"));
        latest.insert("air_temp".into(), json!(21.4));
        latest.insert("apparent_t".into(), json!(19.8));
        latest.insert("gust_kmh".into(), json!(24));
        latest.insert("wind_spd_kmh".into(), json!(15));
        latest.insert("rain_trace".into(), json!("0.2"));

        Self {
            id: id.to_string(),
            name: name.to_string(),
            state: "New South Wales".to_string(),
            wmo_id: wmo_id.into(),
            lat: -33.9,
            lon: 151.2,
            latest,
        }
    }

    pub fn state(mut self, state: &str) -> Self {
        self.state = state.to_string();
        self
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.lat = lat;
        self.lon = lon;
        self
    }

    /// Set a field on the latest row.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.latest.insert(field.to_string(), value.into());
        self
    }

    /// Drop a field from the latest row.
    pub fn without(mut self, field: &str) -> Self {
        self.latest.remove(field);
        self
    }

    /// Member name inside a product bundle, e.g. `IDN60910.94768.json`.
    pub fn member_name(&self, product: &str) -> String {
        let wmo = match &self.wmo_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!("{}.{}.json", product, wmo)
    }

    pub fn to_json(&self) -> Value {
        let mut latest = self.latest.clone();
        latest.insert("sort_order".into(), json!(0));
        latest.insert("name".into(), json!(self.name));
        latest.insert("wmo".into(), self.wmo_id.clone());
        latest.insert("lat".into(), json!(self.lat));
        latest.insert("lon".into(), json!(self.lon));

        let older = json!({
            "sort_order": 1,
            "name": self.name,
            "wmo": self.wmo_id,
            "aifstime_utc": "20240301043000",
            "aifstime_local": "20240301153000",
            "lat": self.lat,
            "lon": self.lon,
            "air_temp": -99.0,
            "apparent_t": -99.0,
            "gust_kmh": 0,
            "wind_spd_kmh": 0,
            "rain_trace": "-",
        });

        json!({
            "observations": {
                "notice": [{
                    "copyright": COPYRIGHT,
                    "copyright_url": "http://www.bom.gov.au/other/copyright.shtml",
                }],
                "header": [{
                    "refresh_message": "Issued at  4:00 pm EDT Friday  1 March 2024",
                    "ID": self.id,
                    "main_ID": self.id,
                    "name": self.name,
                    "state_time_zone": "NSW",
                    "time_zone": "EDT",
                    "product_name": "Weather Observations",
                    "state": self.state,
                    "wmo_id": self.wmo_id,
                }],
                "data": [Value::Object(latest), older],
            }
        })
    }
}
