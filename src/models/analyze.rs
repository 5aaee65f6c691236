//! Analyze result returned by `POST /analyze` and `POST /analyze/coords`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Location;
use crate::i18n::Language;

/// A daily series indexed by day offset; `None` marks a missing observation
pub type Series = Vec<Option<f64>>;

/// Range-level climate and comfort summary for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub location: Location,
    /// Window description, e.g. `20240101 a 20240110`
    pub range: String,
    #[serde(default)]
    pub temperature: Series,
    #[serde(default)]
    pub humidity: Series,
    #[serde(default)]
    pub precipitation: Series,
    #[serde(default)]
    pub wind: Series,
    #[serde(default)]
    pub air_quality_index: AirQuality,
    #[serde(default)]
    pub comfort_index: String,
    #[serde(default)]
    pub comfort_index_i18n: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub eco_impact: String,
    #[serde(default)]
    pub eco_impact_i18n: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub trend: Trends,
    #[serde(default)]
    pub wayra_advisor: String,
    #[serde(default)]
    pub wayra_advisor_i18n: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub best_days: Vec<BestDay>,
    #[serde(default)]
    pub probabilities: Option<Probabilities>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub meta: AnalyzeMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    pub aqi: Option<f64>,
    #[serde(default)]
    pub category: String,
    pub dominant_pollutant: Option<String>,
    #[serde(default)]
    pub source: String,
}

/// Trend indicator per variable (arrows or words such as `up`/`down`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trends {
    #[serde(default)]
    pub temperature: String,
    #[serde(default)]
    pub precipitation: String,
    #[serde(default)]
    pub humidity: String,
    #[serde(default)]
    pub wind: String,
}

/// A candidate day with its suitability score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestDay {
    pub date: String,
    pub score: f64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProbability {
    pub prob: Option<f64>,
    pub n: u32,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleProbability {
    pub prob: Option<f64>,
    pub n: u32,
    pub rule: String,
}

/// Historical threshold-exceedance probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub very_hot: ThresholdProbability,
    pub very_cold: ThresholdProbability,
    pub very_windy: ThresholdProbability,
    pub very_humid: ThresholdProbability,
    pub very_uncomfortable: RuleProbability,
}

/// 25th/75th percentile band aligned with a main series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBand {
    #[serde(default)]
    pub p25: Series,
    #[serde(default)]
    pub p75: Series,
}

/// Data-quality record of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesQuality {
    pub n: usize,
    pub valid: usize,
    pub nulls: usize,
    pub coverage: f64,
}

impl SeriesQuality {
    /// Compute the record for a series; coverage is rounded to 3 decimals
    #[must_use]
    pub fn from_series(series: &[Option<f64>]) -> Self {
        let n = series.len();
        let valid = series.iter().filter(|value| value.is_some()).count();
        let coverage = if n == 0 {
            0.0
        } else {
            (valid as f64 / n as f64 * 1000.0).round() / 1000.0
        };
        Self {
            n,
            valid,
            nulls: n - valid,
            coverage,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    #[serde(default)]
    pub nasa: Option<BTreeMap<String, SeriesQuality>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeMeta {
    /// Unit label per variable
    #[serde(default)]
    pub units: BTreeMap<String, String>,
    #[serde(default)]
    pub data_quality: Option<DataQuality>,
    #[serde(default)]
    pub uncertainty: Option<BTreeMap<String, UncertaintyBand>>,
}

impl AnalyzeMeta {
    #[must_use]
    pub fn quality(&self, variable: &str) -> Option<&SeriesQuality> {
        self.data_quality
            .as_ref()
            .and_then(|quality| quality.nasa.as_ref())
            .and_then(|records| records.get(variable))
    }

    #[must_use]
    pub fn uncertainty(&self, variable: &str) -> Option<&UncertaintyBand> {
        self.uncertainty.as_ref().and_then(|bands| bands.get(variable))
    }

    #[must_use]
    pub fn unit(&self, variable: &str) -> Option<&str> {
        self.units.get(variable).map(String::as_str)
    }
}

fn localized<'a>(
    base: &'a str,
    translations: Option<&'a BTreeMap<String, String>>,
    language: Language,
) -> &'a str {
    translations
        .and_then(|map| map.get(language.code()))
        .map_or(base, String::as_str)
}

impl AnalyzeResponse {
    #[must_use]
    pub fn localized_comfort(&self, language: Language) -> &str {
        localized(&self.comfort_index, self.comfort_index_i18n.as_ref(), language)
    }

    #[must_use]
    pub fn localized_eco_impact(&self, language: Language) -> &str {
        localized(&self.eco_impact, self.eco_impact_i18n.as_ref(), language)
    }

    #[must_use]
    pub fn localized_advisor(&self, language: Language) -> &str {
        localized(&self.wayra_advisor, self.wayra_advisor_i18n.as_ref(), language)
    }

    /// Parallel arrays whose length differs from the temperature series,
    /// as `(name, length)` pairs
    #[must_use]
    pub fn misaligned_series(&self) -> Vec<(String, usize)> {
        let expected = self.temperature.len();
        let mut misaligned: Vec<(String, usize)> = [
            ("humidity", self.humidity.len()),
            ("precipitation", self.precipitation.len()),
            ("wind", self.wind.len()),
        ]
        .into_iter()
        .filter(|(_, len)| *len != expected)
        .map(|(name, len)| (name.to_string(), len))
        .collect();

        for (variable, band) in self.meta.uncertainty.iter().flatten() {
            for (suffix, len) in [("p25", band.p25.len()), ("p75", band.p75.len())] {
                if len != expected {
                    misaligned.push((format!("{variable}.{suffix}"), len));
                }
            }
        }
        misaligned
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    pub fn analyze_json() -> serde_json::Value {
        json!({
            "location": {"city": "Cusco", "country": "PE", "lat": -13.5319, "lon": -71.9675},
            "range": "20240101 a 20240103",
            "temperature": [12.5, null, 14.0],
            "humidity": [60.0, 62.0, null],
            "precipitation": [0.0, 1.2, 3.4],
            "wind": [2.0, 3.5, 4.1],
            "air_quality_index": {"aqi": 42.0, "category": "Buena", "dominant_pollutant": "pm25", "source": "WAQI"},
            "comfort_index": "Agradable",
            "comfort_index_i18n": {"es": "Agradable", "en": "Pleasant"},
            "eco_impact": "Bajo",
            "trend": {"temperature": "⬆", "precipitation": "⬇", "humidity": "➡", "wind": "up"},
            "wayra_advisor": "Lleva abrigo",
            "best_days": [{"date": "2024-01-02", "score": 87.4, "notes": "Seco"}],
            "sources": ["NASA POWER", "Open-Meteo"],
            "meta": {
                "units": {"temperature": "°C (NASA T2M)", "precipitation": "mm/día"},
                "data_quality": {"nasa": {
                    "temperature": {"n": 3, "valid": 2, "nulls": 1, "coverage": 0.667},
                    "precipitation": {"n": 3, "valid": 1, "nulls": 2, "coverage": 0.333}
                }},
                "uncertainty": {
                    "temperature": {"p25": [11.0, null, 13.0], "p75": [14.0, null, 15.5]}
                }
            }
        })
    }

    pub fn analyze_response() -> AnalyzeResponse {
        serde_json::from_value(analyze_json()).unwrap()
    }
}
