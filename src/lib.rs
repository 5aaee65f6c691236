//! `WayraScope` - climate and comfort analysis client
//!
//! This library provides the client core of the dashboard: the shared session
//! state, the analyze and hourly orchestrators, the hourly cache and the
//! transforms that turn backend results into chart rows.

pub mod analyze;
pub mod api;
pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod hourly;
pub mod i18n;
pub mod logging;
pub mod models;
pub mod preferences;
pub mod session;
pub mod store;
pub mod transform;

// Re-export core types for public API
pub use analyze::AnalyzeOrchestrator;
pub use api::{HttpBackend, WeatherBackend};
pub use cache::{HourlyCache, HourlyKey};
pub use config::WayraConfig;
pub use download::DownloadPayload;
pub use error::WayraError;
pub use hourly::{HourlyOrchestrator, HourlyView};
pub use i18n::{Language, Theme};
pub use models::{AnalyzeResponse, Coordinates, EventType, HourlyResponse};
pub use preferences::PreferenceStore;
pub use session::Session;
pub use store::{AppState, AppStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WayraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
