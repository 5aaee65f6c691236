//! Error types and handling for the `WayraScope` client

use serde_json::Value;
use thiserror::Error;

/// Main error type for the `WayraScope` client
#[derive(Error, Debug)]
pub enum WayraError {
    /// Input rejected before any request was sent
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Normalized non-2xx response or transport failure
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        details: Option<Value>,
    },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Preference storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A newer call of the same orchestrator replaced this one
    #[error("Request superseded by a newer one")]
    Superseded,
}

impl WayraError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new API error without status or details
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// Create a new API error carrying the HTTP status and raw body
    pub fn api_with_status<S: Into<String>>(
        message: S,
        status: Option<u16>,
        details: Option<Value>,
    ) -> Self {
        Self::Api {
            message: message.into(),
            status,
            details,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// HTTP status of an API error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            WayraError::Api { status, .. } => *status,
            _ => None,
        }
    }

    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, WayraError::Superseded)
    }

    /// Text stored as the user-visible error state.
    ///
    /// Validation and API messages are already localized when the error is
    /// built, so they are returned verbatim. `None` means the caller should use
    /// its own generic fallback message.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            WayraError::Validation { message } | WayraError::Api { message, .. } => {
                Some(message.clone())
            }
            WayraError::Config { .. }
            | WayraError::Storage { .. }
            | WayraError::Io { .. }
            | WayraError::Superseded => None,
        }
    }
}
