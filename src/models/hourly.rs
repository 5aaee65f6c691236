//! Hourly result returned by `GET /weather/hourly`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One calendar day of hourly observations, aligned by index with `time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyResponse {
    pub date: String,
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature: Vec<Option<f64>>,
    #[serde(default)]
    pub humidity: Vec<Option<f64>>,
    #[serde(default)]
    pub wind: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    pub best_hours: Option<Vec<BestHour>>,
    #[serde(default)]
    pub source: HourlySource,
}

/// A ranked hour candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestHour {
    pub time: String,
    pub score: f64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub units: BTreeMap<String, String>,
}

impl HourlyResponse {
    /// Whether every parallel array has the timestamp array's length
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        let len = self.time.len();
        [
            self.temperature.len(),
            self.humidity.len(),
            self.wind.len(),
            self.precipitation.len(),
        ]
        .iter()
        .all(|other| *other == len)
    }

    #[must_use]
    pub fn unit(&self, variable: &str) -> Option<&str> {
        self.source.units.get(variable).map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    pub fn hourly_json(date: &str) -> serde_json::Value {
        json!({
            "date": date,
            "time": [
                format!("{date}T06:00"),
                format!("{date}T07:00"),
                format!("{date}T08:00"),
                format!("{date}T09:00")
            ],
            "temperature": [8.0, 9.5, 11.0, 12.25],
            "humidity": [80.0, 78.0, null, 70.0],
            "wind": [1.0, 2.5, 10.0, null],
            "precipitation": [0.0, 0.0, 0.2, 0.0],
            "best_hours": [
                {"time": format!("{date}T09:00"), "score": 91.0, "notes": "Soleado"},
                {"time": format!("{date}T08:00"), "score": 80.0, "notes": ""},
                {"time": format!("{date}T07:00"), "score": 75.0, "notes": ""},
                {"time": format!("{date}T06:00"), "score": 40.0, "notes": "Frío"}
            ],
            "source": {"name": "Open-Meteo", "units": {"temperature": "°C", "wind": "m/s"}}
        })
    }

    pub fn hourly_response(date: &str) -> HourlyResponse {
        serde_json::from_value(hourly_json(date)).unwrap()
    }
}
