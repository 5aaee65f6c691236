//! Client settings: backend endpoint, preference storage, logging and the
//! defaults a new session starts from.

use crate::WayraError;
use crate::i18n::Language;
use crate::models::EventType;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `WayraScope` client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WayraConfig {
    /// Analysis backend configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Preference storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default session settings
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Analysis backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the analysis backend
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u32,
    /// Transport-level retries for transient failures (0 disables them)
    #[serde(default)]
    pub max_retries: u32,
}

/// Preference storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Persist language and theme between runs
    #[serde(default = "default_storage_enabled")]
    pub enabled: bool,
    /// Storage directory location
    #[serde(default = "default_storage_location")]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Default session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Language used when none was persisted
    #[serde(default)]
    pub language: Language,
    /// Event type preselected for new sessions
    #[serde(default)]
    pub event_type: EventType,
    /// Bypass the hourly cache when a best day is selected
    #[serde(default = "default_force_best_day_refetch")]
    pub force_best_day_refetch: bool,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_api_timeout() -> u32 {
    30
}

fn default_storage_enabled() -> bool {
    true
}

fn default_storage_location() -> String {
    "~/.cache/wayrascope".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_force_best_day_refetch() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_seconds: default_api_timeout(),
            max_retries: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_storage_enabled(),
            location: default_storage_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            event_type: EventType::default(),
            force_best_day_refetch: default_force_best_day_refetch(),
        }
    }
}

impl StorageConfig {
    /// Storage location with a leading `~` expanded to the home directory
    #[must_use]
    pub fn resolved_location(&self) -> PathBuf {
        match self.location.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.location)),
            None => PathBuf::from(&self.location),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

impl ApiConfig {
    fn check(&self) -> std::result::Result<(), WayraError> {
        if self.timeout_seconds > 300 {
            return Err(WayraError::config("API timeout cannot exceed 300 seconds"));
        }
        if self.max_retries > 10 {
            return Err(WayraError::config("API max retries cannot exceed 10"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(WayraError::config(format!(
                "API base URL '{}' must use http or https",
                self.base_url
            )));
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn check(&self) -> std::result::Result<(), WayraError> {
        let allowed = |field: &str, value: &str, options: &[&str]| {
            if options.contains(&value) {
                Ok(())
            } else {
                Err(WayraError::config(format!(
                    "Invalid log {field} '{value}'. Must be one of: {}",
                    options.join(", ")
                )))
            }
        };
        allowed("level", &self.level, &LOG_LEVELS)?;
        allowed("format", &self.format, &LOG_FORMATS)
    }
}

impl WayraConfig {
    /// Loads the default file (if any) plus environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Loads `config_path`, falling back to [`Self::get_config_path`] and then
    /// `./config.toml`. `WAYRASCOPE_<SECTION>__<KEY>` variables win over the file.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let path = config_path
            .or_else(Self::get_config_path)
            .unwrap_or_else(|| PathBuf::from("config.toml"));

        let mut builder = Config::builder();
        if path.is_file() {
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("WAYRASCOPE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let mut config: WayraConfig = settings
            .try_deserialize()
            .with_context(|| "Configuration has an unexpected shape")?;
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wayrascope").join("config.toml"))
    }

    /// Replaces empty strings and a zero timeout with their defaults
    pub fn apply_defaults(&mut self) {
        let fill = |value: &mut String, default: fn() -> String| {
            if value.trim().is_empty() {
                *value = default();
            }
        };
        fill(&mut self.api.base_url, default_api_base_url);
        fill(&mut self.storage.location, default_storage_location);
        fill(&mut self.logging.level, default_log_level);
        fill(&mut self.logging.format, default_log_format);
        if self.api.timeout_seconds == 0 {
            self.api.timeout_seconds = default_api_timeout();
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.api.check()?;
        self.logging.check()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = WayraConfig::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.api.max_retries, 0);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.defaults.language, Language::Es);
        assert_eq!(config.defaults.event_type, EventType::Viaje);
        assert!(config.defaults.force_best_day_refetch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = WayraConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = WayraConfig::default();
        config.api.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_base_url() {
        let mut config = WayraConfig::default();
        config.api.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults() {
        let mut config = WayraConfig::default();
        config.api.base_url.clear();
        config.api.timeout_seconds = 0;
        config.logging.format.clear();
        config.apply_defaults();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://wayra.example\"\ntimeout_seconds = 10\n\n[defaults]\nlanguage = \"en\"\nevent_type = \"picnic\"\nforce_best_day_refetch = false"
        )
        .unwrap();

        let config = WayraConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.api.base_url, "https://wayra.example");
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.defaults.language, Language::En);
        assert_eq!(config.defaults.event_type, EventType::Picnic);
        assert!(!config.defaults.force_best_day_refetch);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_storage_location_expands_home() {
        let storage = StorageConfig {
            enabled: true,
            location: "/tmp/wayrascope".to_string(),
        };
        assert_eq!(storage.resolved_location(), PathBuf::from("/tmp/wayrascope"));

        let storage = StorageConfig::default();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(storage.resolved_location(), home.join(".cache/wayrascope"));
        }
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = WayraConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("wayrascope"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
