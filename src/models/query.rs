//! Query parameters and request bodies sent to the analysis backend

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Coordinates;
use crate::WayraError;

/// Kind of outdoor event the analysis is tailored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[default]
    Viaje,
    Desfile,
    Caminata,
    Pesca,
    Boda,
    Picnic,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::Viaje,
        EventType::Desfile,
        EventType::Caminata,
        EventType::Pesca,
        EventType::Boda,
        EventType::Picnic,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Viaje => "viaje",
            EventType::Desfile => "desfile",
            EventType::Caminata => "caminata",
            EventType::Pesca => "pesca",
            EventType::Boda => "boda",
            EventType::Picnic => "picnic",
        }
    }
}

impl FromStr for EventType {
    type Err = WayraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        EventType::ALL
            .into_iter()
            .find(|event| event.as_str() == wanted)
            .ok_or_else(|| {
                WayraError::validation(format!(
                    "Unknown event type '{}'. Must be one of: {}",
                    s.trim(),
                    EventType::ALL.map(EventType::as_str).join(", ")
                ))
            })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the query inputs held by the shared store
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub city: String,
    pub coordinates: Option<Coordinates>,
    pub date: NaiveDate,
    pub event_type: EventType,
    pub use_pin: bool,
}

/// Body of `POST /analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub city: String,
    pub date: NaiveDate,
    pub event_type: EventType,
}

/// Body of `POST /analyze/coords`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeCoordsRequest {
    pub lat: f64,
    pub lon: f64,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
}

/// The last request the analyze orchestrator dispatched
#[derive(Debug, Clone, PartialEq)]
pub enum LastQuery {
    City(AnalyzeRequest),
    Coords(AnalyzeCoordsRequest),
}

/// Query of `GET /weather/hourly`
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRequest {
    pub lat: f64,
    pub lon: f64,
    pub date: NaiveDate,
    pub event_type: Option<EventType>,
}

impl HourlyRequest {
    /// Query-string pairs; `event_type` is omitted when absent
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("lat", self.lat.to_string()),
            ("lon", self.lon.to_string()),
            ("date", self.date.format("%Y-%m-%d").to_string()),
        ];
        if let Some(event) = self.event_type {
            pairs.push(("event_type", event.as_str().to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    #[default]
    Csv,
    Json,
}

impl DownloadFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            DownloadFormat::Csv => "csv",
            DownloadFormat::Json => "json",
        }
    }

    #[must_use]
    pub fn default_content_type(self) -> &'static str {
        match self {
            DownloadFormat::Csv => "text/csv;charset=UTF-8",
            DownloadFormat::Json => "application/json;charset=UTF-8",
        }
    }
}

impl FromStr for DownloadFormat {
    type Err = WayraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(DownloadFormat::Csv),
            "json" => Ok(DownloadFormat::Json),
            other => Err(WayraError::validation(format!(
                "Unsupported download format '{other}'. Use csv or json."
            ))),
        }
    }
}

/// Query of `GET /download`
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub city: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub date: NaiveDate,
    pub format: DownloadFormat,
}

impl DownloadRequest {
    /// Query-string pairs; coordinates are sent with 4 decimals
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("date", self.date.format("%Y-%m-%d").to_string()),
            ("fmt", self.format.extension().to_string()),
        ];
        if let Some(coords) = self.coordinates {
            let rounded = coords.rounded(4);
            pairs.push(("lat", rounded.lat.to_string()));
            pairs.push(("lon", rounded.lon.to_string()));
        }
        if let Some(city) = &self.city {
            pairs.push(("city", city.clone()));
        }
        pairs
    }
}
