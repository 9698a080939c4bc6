//! Canonical application state.
//!
//! `AppState` is the single mutable resource of the core. It has exactly one
//! writer (the reducer, driven by the store's dispatch loop) and many
//! snapshot readers. All fields are plain data; middleware and UI consumers
//! receive immutable `Arc<AppState>` snapshots.

use time::OffsetDateTime;
use uuid::Uuid;

use glucolink_types::{
    CalibrationPoint, ConnectionState, GlucoseReading, GlucoseUnit, Sensor, Transmitter,
};

use crate::config::CoreConfig;

/// A recorded connection error.
///
/// Message, timestamp, and criticality travel together: either no error is
/// recorded or all three are, never a partial set.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionError {
    /// Human-readable description.
    pub message: String,
    /// When the error was observed.
    pub timestamp: OffsetDateTime,
    /// Whether the error is irrecoverable (suppresses silent retry).
    pub is_critical: bool,
}

/// Aggregate application state.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Active sensor, if a session is running.
    pub sensor: Option<Sensor>,
    /// External transmitter, if one relays the sensor.
    pub transmitter: Option<Transmitter>,
    /// Bounded, ordered history of accepted readings.
    pub glucose_values: Vec<GlucoseReading>,
    /// Maximum number of readings retained in `glucose_values`.
    pub glucose_history_limit: usize,
    /// Calibration points for the active sensor session.
    pub calibration: Vec<CalibrationPoint>,
    /// Current link status.
    pub connection_state: ConnectionState,
    /// Last connection error, if one is recorded.
    pub connection_error: Option<ConnectionError>,
    /// Whether the connection target has completed pairing.
    pub is_paired: bool,
    /// Remembered hardware link id for reconnection.
    pub peripheral_id: Option<String>,
    /// Currently selected logical connection target.
    pub selected_connection_id: Option<String>,
    /// Lower alarm threshold in mg/dL.
    pub alarm_low: f64,
    /// Upper alarm threshold in mg/dL.
    pub alarm_high: f64,
    /// Alarm snooze deadline; always a future timestamp while set.
    pub alarm_snooze_until: Option<OffsetDateTime>,
    /// Consecutive transport cycles that delivered no reading.
    pub missed_readings: u32,
    /// Display unit for glucose values.
    pub glucose_unit: GlucoseUnit,
    /// User-selected view tag.
    pub selected_view: i32,
    /// Selected external export target, if any.
    pub selected_export_target: Option<Uuid>,
}

impl AppState {
    /// Create the initial state from a configuration.
    #[must_use]
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            sensor: None,
            transmitter: None,
            glucose_values: Vec::new(),
            glucose_history_limit: config.glucose_history_limit,
            calibration: Vec::new(),
            connection_state: ConnectionState::Disconnected,
            connection_error: None,
            is_paired: false,
            peripheral_id: None,
            selected_connection_id: None,
            alarm_low: config.alarm_low,
            alarm_high: config.alarm_high,
            alarm_snooze_until: None,
            missed_readings: 0,
            glucose_unit: GlucoseUnit::MgDl,
            selected_view: 0,
            selected_export_target: None,
        }
    }

    /// The most recently accepted reading.
    #[must_use]
    pub fn latest_glucose(&self) -> Option<&GlucoseReading> {
        self.glucose_values.last()
    }

    /// Clear the recorded connection error (all fields together).
    pub fn clear_connection_error(&mut self) {
        self.connection_error = None;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&CoreConfig::default())
    }
}
