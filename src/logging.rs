//! Tracing subscriber setup for the binary.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Filter used when `RUST_LOG` is not set
#[must_use]
pub fn default_filter(config: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("warn,wayrascope={level}")
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config, verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };
    installed.map_err(|err| anyhow::anyhow!(err.to_string()))
}
