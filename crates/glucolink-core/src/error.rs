//! Error types for glucolink-core.
//!
//! Two tiers of failure exist in this crate and only one of them is an
//! `Error`. Guard failures inside the reducer (an action arriving outside its
//! valid lifecycle window, e.g. a calibration add with no sensor) are logged
//! and dropped at the reducer boundary; they never surface here. Everything
//! else — transport faults, configuration problems, a closed dispatch
//! channel — is a real error and uses this type.

use thiserror::Error;

/// Errors that can occur in the telemetry core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure surfaced by the sensor driver.
    #[error("Transport error: {message}{}", .code.map(|c| format!(" (code {c})")).unwrap_or_default())]
    Transport {
        /// Human-readable description.
        message: String,
        /// Driver-specific numeric code, if one was reported.
        code: Option<i32>,
    },

    /// The store's dispatch loop has shut down and no longer accepts actions.
    #[error("Dispatch channel closed")]
    DispatchClosed,

    /// Operation attempted while no sensor connection is active.
    #[error("Not connected to sensor")]
    NotConnected,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to parse a configuration file.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Failed to serialize an export record.
    #[error("Export serialization error: {0}")]
    ExportSerialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a transport error carrying only a message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            code: None,
        }
    }

    /// Create a transport error carrying a driver code.
    pub fn transport_code(message: impl Into<String>, code: i32) -> Self {
        Self::Transport {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using glucolink-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
