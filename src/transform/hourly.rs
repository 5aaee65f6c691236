//! Hourly chart dataset and the best-hour overlay.

use std::collections::HashSet;

use serde::Serialize;

use super::format::{format_hour, mps_to_kmh};
use crate::models::{BestHour, HourlyResponse};

/// Number of best hours highlighted on the chart
pub const BEST_HOURS_SHOWN: usize = 3;

/// Display unit of the wind series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WindUnit {
    /// The source's native unit
    #[default]
    Native,
    Kmh,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRow {
    pub iso: String,
    /// `HH:MM`
    pub hour: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind: Option<f64>,
    pub precipitation: Option<f64>,
    /// Wind in the selected display unit
    pub display_wind: Option<f64>,
    /// Marked by the best-hour overlay
    pub best: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyUnits {
    pub temperature: String,
    pub humidity: String,
    pub wind: String,
    pub precipitation: String,
}

/// A highlighted hour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestHourMark {
    pub hour: String,
    pub score: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyDataset {
    pub rows: Vec<HourlyRow>,
    pub units: HourlyUnits,
    pub best_hours: Vec<BestHourMark>,
}

/// Unit labels, falling back to the defaults of the hourly source
#[must_use]
pub fn hourly_units(data: &HourlyResponse, wind_unit: WindUnit) -> HourlyUnits {
    let unit = |variable: &str, fallback: &str| data.unit(variable).unwrap_or(fallback).to_string();
    HourlyUnits {
        temperature: unit("temperature", "°C"),
        humidity: unit("humidity", "%"),
        wind: match wind_unit {
            WindUnit::Kmh => "km/h".to_string(),
            WindUnit::Native => unit("wind", "m/s"),
        },
        precipitation: unit("precipitation", "mm/h"),
    }
}

/// The first [`BEST_HOURS_SHOWN`] entries, in the order the source ranked them
#[must_use]
pub fn top_best_hours(best_hours: &[BestHour]) -> Vec<BestHourMark> {
    best_hours
        .iter()
        .take(BEST_HOURS_SHOWN)
        .map(|best| BestHourMark {
            hour: format_hour(&best.time),
            score: best.score,
            notes: best.notes.clone(),
        })
        .collect()
}

/// One row per timestamp; values missing from shorter arrays become `None`.
///
/// The stored series is never modified, km/h values only land in
/// `display_wind`.
#[must_use]
pub fn build_hourly_rows(
    data: &HourlyResponse,
    wind_unit: WindUnit,
    best_labels: &HashSet<String>,
) -> Vec<HourlyRow> {
    let at = |series: &[Option<f64>], index: usize| series.get(index).copied().flatten();

    data.time
        .iter()
        .enumerate()
        .map(|(index, timestamp)| {
            let hour = format_hour(timestamp);
            let wind = at(&data.wind, index);
            HourlyRow {
                iso: timestamp.clone(),
                best: best_labels.contains(&hour),
                hour,
                temperature: at(&data.temperature, index),
                humidity: at(&data.humidity, index),
                wind,
                precipitation: at(&data.precipitation, index),
                display_wind: match wind_unit {
                    WindUnit::Native => wind,
                    WindUnit::Kmh => wind.map(mps_to_kmh),
                },
            }
        })
        .collect()
}

#[must_use]
pub fn build_hourly_dataset(data: &HourlyResponse, wind_unit: WindUnit) -> HourlyDataset {
    let best_hours = top_best_hours(data.best_hours.as_deref().unwrap_or_default());
    let labels: HashSet<String> = best_hours.iter().map(|best| best.hour.clone()).collect();

    HourlyDataset {
        rows: build_hourly_rows(data, wind_unit, &labels),
        units: hourly_units(data, wind_unit),
        best_hours,
    }
}
