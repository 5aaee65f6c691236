//! Data models for the `WayraScope` client
//!
//! This module contains the wire types organized by concern:
//! - Location: coordinates and the server-resolved place
//! - Query: query parameters and request bodies
//! - Analyze: the range-level analysis result
//! - Hourly: the single-day hourly result

pub mod analyze;
pub mod hourly;
pub mod location;
pub mod query;

// Re-export all public types for convenient access
pub use analyze::{
    AirQuality, AnalyzeMeta, AnalyzeResponse, BestDay, DataQuality, Probabilities,
    RuleProbability, Series, SeriesQuality, ThresholdProbability, Trends, UncertaintyBand,
};
pub use hourly::{BestHour, HourlyResponse, HourlySource};
pub use location::{Coordinates, Location};
pub use query::{
    AnalyzeCoordsRequest, AnalyzeRequest, DownloadFormat, DownloadRequest, EventType,
    HourlyRequest, LastQuery, QueryParams,
};
