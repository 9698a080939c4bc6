//! The reducer: a single pure entry point applying actions to state.
//!
//! `apply` is total over the action set. Guard failures (an action arriving
//! outside its valid lifecycle window, e.g. a calibration add before any
//! reading was observed) are logged and dropped; the prior state is returned
//! unchanged and nothing propagates to the caller. Side effects are never
//! performed here — the reducer emits declarative [`Effect`] requests that
//! the store's effect runner carries out.
//!
//! The current time is injected so snooze expiry and session back-dating are
//! deterministic under test.

use core::fmt;

use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::action::{AppAction, Effect};
use crate::history;
use crate::state::{AppState, ConnectionError};

/// Why an action was dropped without touching state.
///
/// These are expected under asynchronous delivery and are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardFailure {
    /// The action requires an active sensor.
    NoSensor,
    /// The action requires at least one observed reading.
    NoLatestReading,
}

impl fmt::Display for GuardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardFailure::NoSensor => write!(f, "no active sensor"),
            GuardFailure::NoLatestReading => write!(f, "no reading observed yet"),
        }
    }
}

/// Apply one action to the state, returning the effects to run.
///
/// Invariants upheld on every return:
/// - the history buffer never exceeds its configured maximum;
/// - calibration points only exist while a sensor is set;
/// - the connection error triple is set or cleared atomically;
/// - a lapsed snooze deadline is cleared before returning.
pub fn apply(state: &mut AppState, action: &AppAction, now: OffsetDateTime) -> Vec<Effect> {
    let mut effects = Vec::new();

    if let Err(guard) = reduce(state, action, now, &mut effects) {
        debug!(%guard, ?action, "guard failed, action dropped");
        effects.clear();
    }

    if let Some(until) = state.alarm_snooze_until {
        if now > until {
            state.alarm_snooze_until = None;
        }
    }

    effects
}

fn reduce(
    state: &mut AppState,
    action: &AppAction,
    now: OffsetDateTime,
    effects: &mut Vec<Effect>,
) -> Result<(), GuardFailure> {
    match action {
        AppAction::AddCalibration { value } => {
            let raw = state
                .latest_glucose()
                .map(|r| r.raw_value)
                .ok_or(GuardFailure::NoLatestReading)?;

            state
                .calibration
                .push(glucolink_types::CalibrationPoint::new(raw, *value));
        }

        AppAction::AddGlucose { readings } => {
            let existing = std::mem::take(&mut state.glucose_values);
            state.glucose_values =
                history::append(existing, readings.clone(), state.glucose_history_limit);
            state.missed_readings = 0;
        }

        AppAction::AddMissedReading => {
            state.missed_readings = state.missed_readings.saturating_add(1);
        }

        AppAction::ClearCalibrations => {
            require_sensor(state)?;
            state.calibration.clear();
        }

        AppAction::ClearGlucoseValues => {
            state.glucose_values.clear();
        }

        AppAction::RemoveCalibration { id } => {
            require_sensor(state)?;
            state.calibration.retain(|p| p.id != *id);
        }

        AppAction::RemoveGlucose { id } => {
            let existing = std::mem::take(&mut state.glucose_values);
            state.glucose_values = history::remove(existing, *id);
        }

        AppAction::ResetSensor => {
            state.sensor = None;
            state.calibration.clear();
            state.clear_connection_error();
        }

        AppAction::SelectConnection { id } => {
            // Re-selecting the current target is a no-op; switching targets
            // models a fresh session.
            if state.selected_connection_id.as_deref() != Some(id.as_str()) {
                state.selected_connection_id = Some(id.clone());
                state.is_paired = false;
                state.sensor = None;
                state.transmitter = None;
                state.calibration.clear();
                state.clear_connection_error();
            }
        }

        AppAction::SelectView { tag } => {
            state.selected_view = *tag;
        }

        AppAction::SelectExportTarget { id } => {
            state.selected_export_target = *id;
        }

        AppAction::SetAlarmHigh { limit } => {
            state.alarm_high = *limit;
        }

        AppAction::SetAlarmLow { limit } => {
            state.alarm_low = *limit;
        }

        AppAction::SetAlarmSnooze { until, autosnooze } => {
            state.alarm_snooze_until = *until;

            if !autosnooze {
                effects.push(Effect::StopAlarmSound);
            }
        }

        AppAction::SetConnectionError {
            message,
            timestamp,
            is_critical,
        } => {
            state.connection_error = Some(ConnectionError {
                message: message.clone(),
                timestamp: *timestamp,
                is_critical: *is_critical,
            });
        }

        AppAction::SetConnectionPaired { paired } => {
            state.is_paired = *paired;
        }

        AppAction::SetPeripheral { id } => {
            state.peripheral_id = id.clone();
        }

        AppAction::SetConnectionState {
            state: connection_state,
        } => {
            state.connection_state = *connection_state;

            if connection_state.is_resettable() {
                state.clear_connection_error();
            }
        }

        AppAction::SetSensor {
            sensor,
            keep_device,
        } => {
            if let Some(current) = &state.sensor {
                if current.serial != sensor.serial {
                    state.calibration.clear();

                    if !keep_device {
                        state.peripheral_id = None;
                    }
                }
            }

            state.sensor = Some(sensor.clone());
            state.clear_connection_error();
        }

        AppAction::SetSensorState {
            age_minutes,
            lifecycle,
        } => {
            let sensor = state.sensor.as_mut().ok_or(GuardFailure::NoSensor)?;

            sensor.age_minutes = *age_minutes;

            if let Some(lifecycle) = lifecycle {
                sensor.lifecycle = *lifecycle;
            }

            if sensor.start.is_none() {
                sensor.start = Some(now - Duration::minutes(i64::from(*age_minutes)));
            }
        }

        AppAction::SetTransmitter { transmitter } => {
            state.transmitter = Some(transmitter.clone());
        }

        // Pure intents, consumed by middleware only.
        AppAction::PairConnection
        | AppAction::ConnectConnection
        | AppAction::DisconnectConnection
        | AppAction::Startup => {}
    }

    Ok(())
}

fn require_sensor(state: &AppState) -> Result<(), GuardFailure> {
    if state.sensor.is_some() {
        Ok(())
    } else {
        Err(GuardFailure::NoSensor)
    }
}
