//! The closed action vocabulary of the reducer.
//!
//! Every state change in the core flows through exactly one of these
//! actions. Actions carry strongly-typed payloads and are serializable for
//! logging and replay. A handful of variants are pure intents consumed only
//! by middleware (`PairConnection`, `ConnectConnection`,
//! `DisconnectConnection`, `Startup`); the reducer leaves state untouched for
//! those.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use glucolink_types::{ConnectionState, GlucoseReading, Sensor, SensorLifecycle, Transmitter};

/// Actions applied to [`AppState`](crate::state::AppState) by the reducer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppAction {
    /// Add a calibration point pairing the latest raw value with a
    /// user-supplied reference value.
    AddCalibration {
        /// Reference glucose value in mg/dL.
        value: f64,
    },
    /// Append a batch of accepted readings to the history buffer.
    AddGlucose {
        /// Readings in arrival order.
        readings: Vec<GlucoseReading>,
    },
    /// Record a transport cycle that delivered no data.
    AddMissedReading,
    /// Drop all calibration points for the active sensor.
    ClearCalibrations,
    /// Empty the glucose history buffer.
    ClearGlucoseValues,
    /// Remove a single calibration point by id.
    RemoveCalibration {
        /// Id of the point to remove.
        id: Uuid,
    },
    /// Remove a single reading by id.
    RemoveGlucose {
        /// Id of the reading to remove.
        id: Uuid,
    },
    /// Clear the sensor, its calibration, and any recorded error.
    ResetSensor,
    /// Select a logical connection target.
    SelectConnection {
        /// Identifier of the target.
        id: String,
    },
    /// Select a user-facing view.
    SelectView {
        /// Opaque view tag.
        tag: i32,
    },
    /// Select an external export target.
    SelectExportTarget {
        /// Target id, or `None` to deselect.
        id: Option<Uuid>,
    },
    /// Set the upper alarm threshold.
    SetAlarmHigh {
        /// Threshold in mg/dL.
        limit: f64,
    },
    /// Set the lower alarm threshold.
    SetAlarmLow {
        /// Threshold in mg/dL.
        limit: f64,
    },
    /// Set or clear the alarm snooze deadline.
    SetAlarmSnooze {
        /// Deadline, or `None` to clear.
        until: Option<OffsetDateTime>,
        /// Whether the snooze was applied automatically (no user gesture).
        autosnooze: bool,
    },
    /// Record a connection error.
    SetConnectionError {
        /// Human-readable description.
        message: String,
        /// When the error was observed.
        timestamp: OffsetDateTime,
        /// Whether the error is irrecoverable.
        is_critical: bool,
    },
    /// Record the pairing flag.
    SetConnectionPaired {
        /// Whether pairing completed.
        paired: bool,
    },
    /// Remember or forget the hardware link id.
    SetPeripheral {
        /// Link id, or `None` to forget.
        id: Option<String>,
    },
    /// Record a link status change.
    SetConnectionState {
        /// New status.
        state: ConnectionState,
    },
    /// Replace the active sensor.
    SetSensor {
        /// The new sensor.
        sensor: Sensor,
        /// Keep the remembered hardware link id even if the serial changed.
        keep_device: bool,
    },
    /// Update the active sensor's age and lifecycle.
    SetSensorState {
        /// Age in minutes since start.
        age_minutes: u32,
        /// Lifecycle state, if the driver reported one.
        lifecycle: Option<SensorLifecycle>,
    },
    /// Replace the transmitter.
    SetTransmitter {
        /// The new transmitter.
        transmitter: Transmitter,
    },
    /// Request pairing; consumed by the connection middleware.
    PairConnection,
    /// Request connection; consumed by the connection middleware.
    ConnectConnection,
    /// Request disconnection; consumed by the connection middleware.
    DisconnectConnection,
    /// Application startup marker; consumed by middleware.
    Startup,
}

/// Declarative side-effect requests emitted by the reducer.
///
/// The reducer never performs I/O; it emits effects and the store's effect
/// runner carries them out after the state transition is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Stop any currently playing alarm sound.
    StopAlarmSound,
}
