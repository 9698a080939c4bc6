//! Core configuration.
//!
//! All tunables of the telemetry core live here: the history buffer capacity,
//! default alarm thresholds, the event channel capacity, and the transport
//! error code treated as critical. Values can be loaded from a TOML document
//! or constructed programmatically; missing fields fall back to defaults.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Transport error code denoting an irrecoverable/illegal-state failure.
///
/// Errors carrying this code are stored as critical and suppress automatic
/// silent retry by the driver. All other codes are recoverable.
pub const CRITICAL_ERROR_CODE: i32 = 7;

/// Configuration for the telemetry core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Maximum number of glucose readings retained in the history buffer.
    pub glucose_history_limit: usize,
    /// Default lower alarm threshold in mg/dL.
    pub alarm_low: f64,
    /// Default upper alarm threshold in mg/dL.
    pub alarm_high: f64,
    /// Capacity of the state snapshot broadcast channel.
    pub event_capacity: usize,
    /// Transport error code classified as critical.
    pub critical_error_code: i32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            // 24 hours of one-minute readings.
            glucose_history_limit: 1440,
            alarm_low: 80.0,
            alarm_high: 180.0,
            event_capacity: 100,
            critical_error_code: CRITICAL_ERROR_CODE,
        }
    }
}

impl CoreConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the history buffer capacity.
    pub fn glucose_history_limit(mut self, limit: usize) -> Self {
        self.glucose_history_limit = limit;
        self
    }

    /// Set the default alarm thresholds.
    pub fn alarm_thresholds(mut self, low: f64, high: f64) -> Self {
        self.alarm_low = low;
        self.alarm_high = high;
        self
    }

    /// Parse a configuration from a TOML document and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for malformed TOML and
    /// [`Error::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return an error if invalid.
    ///
    /// Checks that:
    /// - `glucose_history_limit` is > 0
    /// - `event_capacity` is > 0
    /// - `alarm_low` < `alarm_high`
    pub fn validate(&self) -> Result<()> {
        if self.glucose_history_limit == 0 {
            return Err(Error::invalid_config("glucose_history_limit must be > 0"));
        }
        if self.event_capacity == 0 {
            return Err(Error::invalid_config("event_capacity must be > 0"));
        }
        if self.alarm_low >= self.alarm_high {
            return Err(Error::invalid_config("alarm_low must be < alarm_high"));
        }
        Ok(())
    }
}
