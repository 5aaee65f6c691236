//! Small value formatters shared by the daily and hourly transforms.

use chrono::{DateTime, NaiveDateTime};

use crate::i18n::Language;

/// Turns a compact `YYYYMMDD` date into `YYYY-MM-DD`; anything else is
/// returned unchanged
#[must_use]
pub fn format_nasa_date(value: &str) -> String {
    if value.len() != 8 || value.contains('-') || !value.is_ascii() {
        return value.to_string();
    }
    format!("{}-{}-{}", &value[0..4], &value[4..6], &value[6..8])
}

/// `HH:MM` label of a timestamp, or the input when it cannot be parsed
#[must_use]
pub fn format_hour(value: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return parsed.format("%H:%M").to_string();
    }
    [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%MZ",
        "%Y-%m-%d %H:%M",
    ]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(value, pattern).ok())
        .map_or_else(|| value.to_string(), |parsed| parsed.format("%H:%M").to_string())
}

/// Converts m/s to km/h, rounded to 2 decimals
#[must_use]
pub fn mps_to_kmh(value: f64) -> f64 {
    round_value(value * 3.6, 2)
}

#[must_use]
pub fn round_value(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

/// Formats a fraction as a whole percentage, e.g. `0.256` becomes `26%`.
/// Halves round away from zero.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{:.0}%", (value * 100.0).round())
}

/// Percentage of a probability, or the no-data marker when it is unknown
#[must_use]
pub fn format_probability(value: Option<f64>, language: Language) -> String {
    value.map_or_else(|| language.messages().no_data.to_string(), format_percent)
}

/// Start and end of a range such as `20240101 a 20240110`, both dashed
#[must_use]
pub fn range_to_dates(range: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = range.split_whitespace().collect();
    match tokens.as_slice() {
        [start, separator, end] if is_range_separator(separator) => {
            Some((format_nasa_date(start), format_nasa_date(end)))
        }
        _ => None,
    }
}

pub(crate) fn is_range_separator(token: &str) -> bool {
    matches!(token.to_lowercase().as_str(), "a" | "to" | "-" | "→")
}
