//! Daily chart dataset built from an analyze result.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use super::dates::build_dates;
use crate::WayraError;
use crate::models::{AnalyzeMeta, AnalyzeResponse, SeriesQuality};

/// Coverage below which a series is flagged as incomplete
pub const COVERAGE_WARNING_THRESHOLD: f64 = 0.6;

/// Variable shown by the daily chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DailyVariable {
    #[default]
    Temperature,
    Precipitation,
}

impl DailyVariable {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DailyVariable::Temperature => "temperature",
            DailyVariable::Precipitation => "precipitation",
        }
    }

    fn default_unit(self) -> &'static str {
        match self {
            DailyVariable::Temperature => "°C",
            DailyVariable::Precipitation => "mm",
        }
    }
}

impl FromStr for DailyVariable {
    type Err = WayraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(DailyVariable::Temperature),
            "precipitation" | "prec" => Ok(DailyVariable::Precipitation),
            other => Err(WayraError::validation(format!(
                "Unknown chart variable '{other}'. Use temperature or precipitation."
            ))),
        }
    }
}

impl fmt::Display for DailyVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day of the chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRow {
    pub date: String,
    pub temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub temp_p25: Option<f64>,
    pub temp_p75: Option<f64>,
    pub prec_p25: Option<f64>,
    pub prec_p75: Option<f64>,
}

impl DailyRow {
    #[must_use]
    pub fn value(&self, variable: DailyVariable) -> Option<f64> {
        match variable {
            DailyVariable::Temperature => self.temperature,
            DailyVariable::Precipitation => self.precipitation,
        }
    }

    /// p25/p75 band of the variable when both bounds are known
    #[must_use]
    pub fn spread(&self, variable: DailyVariable) -> Option<(f64, f64)> {
        let (low, high) = match variable {
            DailyVariable::Temperature => (self.temp_p25, self.temp_p75),
            DailyVariable::Precipitation => (self.prec_p25, self.prec_p75),
        };
        low.zip(high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

/// Everything the daily chart needs for one variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDataset {
    pub variable: DailyVariable,
    pub unit: String,
    pub rows: Vec<DailyRow>,
    pub stats: Option<DailyStats>,
    /// Row highlighted when nothing is hovered
    pub focus: Option<usize>,
    /// Position of the focused value between min and max
    pub focus_position: Option<f64>,
    /// Coverage of the variable when it is below the warning threshold
    pub incomplete_coverage: Option<f64>,
}

fn at(series: Option<&[Option<f64>]>, index: usize) -> Option<f64> {
    series.and_then(|values| values.get(index).copied().flatten())
}

/// Assembles chart rows; shorter series and missing bands yield `None`.
///
/// The row count is the longer of the temperature and precipitation series.
#[must_use]
pub fn build_rows(
    range: &str,
    temperature: &[Option<f64>],
    precipitation: &[Option<f64>],
    meta: &AnalyzeMeta,
) -> Vec<DailyRow> {
    let length = temperature.len().max(precipitation.len());
    let temp_band = meta.uncertainty("temperature");
    let prec_band = meta.uncertainty("precipitation");

    build_dates(range, length)
        .into_iter()
        .enumerate()
        .map(|(index, date)| DailyRow {
            date,
            temperature: at(Some(temperature), index),
            precipitation: at(Some(precipitation), index),
            temp_p25: at(temp_band.map(|band| band.p25.as_slice()), index),
            temp_p75: at(temp_band.map(|band| band.p75.as_slice()), index),
            prec_p25: at(prec_band.map(|band| band.p25.as_slice()), index),
            prec_p75: at(prec_band.map(|band| band.p75.as_slice()), index),
        })
        .collect()
}

/// Whether a series should carry the incomplete-data warning
#[must_use]
pub fn is_incomplete(quality: Option<&SeriesQuality>) -> bool {
    quality.is_some_and(|quality| quality.coverage < COVERAGE_WARNING_THRESHOLD)
}

/// Min, average and max over the known values of a variable
#[must_use]
pub fn daily_stats(rows: &[DailyRow], variable: DailyVariable) -> Option<DailyStats> {
    let values: Vec<f64> = rows.iter().filter_map(|row| row.value(variable)).collect();
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some(DailyStats { min, avg, max })
}

/// Row to highlight: the event date when it has a value, else the last row
/// with a value
#[must_use]
pub fn focus_index(rows: &[DailyRow], event_date: &str, variable: DailyVariable) -> Option<usize> {
    rows.iter()
        .position(|row| row.date == event_date)
        .filter(|index| rows[*index].value(variable).is_some())
        .or_else(|| rows.iter().rposition(|row| row.value(variable).is_some()))
}

/// Where `value` sits between the min and max, clamped to `[0, 1]`
#[must_use]
pub fn relative_position(value: f64, stats: &DailyStats) -> Option<f64> {
    let span = stats.max - stats.min;
    if span == 0.0 {
        return Some(0.5);
    }
    let ratio = (value - stats.min) / span;
    if ratio.is_nan() {
        None
    } else {
        Some(ratio.clamp(0.0, 1.0))
    }
}

/// Builds the full daily dataset for `variable` around `event_date`
#[must_use]
pub fn build_daily_dataset(
    result: &AnalyzeResponse,
    variable: DailyVariable,
    event_date: NaiveDate,
) -> DailyDataset {
    let rows = build_rows(
        &result.range,
        &result.temperature,
        &result.precipitation,
        &result.meta,
    );
    let stats = daily_stats(&rows, variable);
    let focus = focus_index(&rows, &event_date.format("%Y-%m-%d").to_string(), variable);
    let focus_position = focus
        .and_then(|index| rows[index].value(variable))
        .zip(stats.as_ref())
        .and_then(|(value, stats)| relative_position(value, stats));

    let quality = result.meta.quality(variable.as_str());
    let incomplete_coverage = if is_incomplete(quality) {
        quality.map(|quality| quality.coverage)
    } else {
        None
    };

    DailyDataset {
        variable,
        unit: result
            .meta
            .unit(variable.as_str())
            .unwrap_or(variable.default_unit())
            .to_string(),
        rows,
        stats,
        focus,
        focus_position,
        incomplete_coverage,
    }
}
