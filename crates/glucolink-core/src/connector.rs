//! Connection state machine.
//!
//! Translates typed transport updates into reducer actions. The transport
//! driver (BLE or otherwise) runs on its own execution context and delivers
//! [`TransportUpdate`]s over a channel; the connector pump turns every update
//! into exactly one dispatched action and never mutates state directly.
//!
//! Transition policy lives in the driver; the core only records the states it
//! is told about. The one piece of policy owned here is error
//! classification: a driver error carrying the configured illegal-state code
//! is stored as critical, everything else as recoverable.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use glucolink_types::{
    ConnectionState, GlucoseReading, Sensor, SensorLifecycle, Transmitter, Trend,
};

use crate::action::AppAction;
use crate::calibration::Calibrator;
use crate::config::CoreConfig;
use crate::error::Result;
use crate::store::Dispatcher;

/// A raw sample produced by the sensor, before calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    /// Retry-stable identifier assigned by the driver.
    pub id: Uuid,
    /// When the sensor produced the sample.
    pub timestamp: OffsetDateTime,
    /// Raw value in mg/dL.
    pub raw_value: f64,
}

impl RawReading {
    /// Create a raw reading with a fresh identifier.
    #[must_use]
    pub fn new(timestamp: OffsetDateTime, raw_value: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            raw_value,
        }
    }
}

/// Typed updates delivered by a transport driver.
///
/// A closed set: the pump matches exhaustively, so a new update kind is a
/// compile error at the translation site rather than a silently dropped
/// event.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportUpdate {
    /// Link status changed.
    ConnectionState(ConnectionState),
    /// Sensor discovered or changed.
    Sensor {
        /// The discovered sensor.
        sensor: Sensor,
        /// Keep the remembered hardware link id even on a serial change.
        keep_device: bool,
    },
    /// Transmitter discovered or changed.
    Transmitter(Transmitter),
    /// Sensor age/lifecycle changed.
    SensorState {
        /// Age in minutes since start.
        age_minutes: u32,
        /// Lifecycle, if the driver reported one.
        lifecycle: Option<SensorLifecycle>,
    },
    /// The next single reading is available.
    NextReading(RawReading),
    /// A batch of trend readings plus a batch of historical readings.
    Readings {
        /// Recent readings in arrival order.
        trend: Vec<RawReading>,
        /// Backfilled historical readings, oldest first.
        history: Vec<RawReading>,
    },
    /// The driver reported an error.
    Error {
        /// Human-readable description.
        message: String,
        /// Driver-specific numeric code, if one was reported.
        code: Option<i32>,
    },
    /// The driver completed a cycle without data.
    Missed,
}

/// Channel half handed to a transport driver for delivering updates.
pub type UpdateSender = mpsc::Sender<TransportUpdate>;

/// Receiving half consumed by the connector pump.
pub type UpdateReceiver = mpsc::Receiver<TransportUpdate>;

/// Create an update channel with the given capacity.
pub fn update_channel(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    mpsc::channel(capacity)
}

/// A physical sensor link.
///
/// Implemented by transport drivers; the scripted
/// [`MockTransport`](crate::mock::MockTransport) implements it for tests.
/// Pairing/connection timeouts are the driver's responsibility and surface
/// only as [`TransportUpdate`]s.
#[async_trait]
pub trait SensorTransport: Send + Sync {
    /// Pair with a sensor, delivering updates on `updates`.
    async fn pair(&mut self, updates: UpdateSender) -> Result<()>;

    /// Connect to a previously paired sensor.
    async fn connect(&mut self, sensor: Option<Sensor>, updates: UpdateSender) -> Result<()>;

    /// Tear the link down.
    async fn disconnect(&mut self) -> Result<()>;
}

/// Build domain readings from raw samples.
///
/// Applies the current calibration mapping and derives the minute-over-minute
/// delta and trend against the previous reading (the latest stored reading
/// for the first sample, then each preceding sample in the batch). The
/// calibrated value is fixed here; later calibration changes do not touch it.
#[must_use]
pub fn build_readings(
    raws: Vec<RawReading>,
    latest: Option<&GlucoseReading>,
    calibrator: &Calibrator,
) -> Vec<GlucoseReading> {
    let mut readings = Vec::with_capacity(raws.len());
    let mut previous = latest.cloned();

    for raw in raws {
        let value = calibrator.apply(raw.raw_value);

        let minute_change = previous.as_ref().and_then(|prev| {
            let minutes = (raw.timestamp - prev.timestamp).as_seconds_f64() / 60.0;
            if minutes > 0.0 {
                Some((value - prev.glucose_value) / minutes)
            } else {
                None
            }
        });

        let trend = minute_change.map_or(Trend::Unknown, Trend::from_minute_change);

        let reading = GlucoseReading {
            id: raw.id,
            timestamp: raw.timestamp,
            raw_value: raw.raw_value,
            glucose_value: value,
            trend,
            minute_change,
        };

        previous = Some(reading.clone());
        readings.push(reading);
    }

    readings
}

/// Translate one transport update into exactly one action.
///
/// `latest` and `calibrator` come from the state snapshot current at
/// translation time; `now` timestamps errors.
#[must_use]
pub fn translate(
    update: TransportUpdate,
    latest: Option<&GlucoseReading>,
    calibrator: &Calibrator,
    critical_code: i32,
    now: OffsetDateTime,
) -> AppAction {
    match update {
        TransportUpdate::ConnectionState(state) => AppAction::SetConnectionState { state },

        TransportUpdate::Sensor {
            sensor,
            keep_device,
        } => AppAction::SetSensor {
            sensor,
            keep_device,
        },

        TransportUpdate::Transmitter(transmitter) => AppAction::SetTransmitter { transmitter },

        TransportUpdate::SensorState {
            age_minutes,
            lifecycle,
        } => AppAction::SetSensorState {
            age_minutes,
            lifecycle,
        },

        TransportUpdate::NextReading(raw) => AppAction::AddGlucose {
            readings: build_readings(vec![raw], latest, calibrator),
        },

        TransportUpdate::Readings { trend, history } => {
            // History backfill is older than the trend window; keep arrival order.
            let mut raws = history;
            raws.extend(trend);
            AppAction::AddGlucose {
                readings: build_readings(raws, latest, calibrator),
            }
        }

        TransportUpdate::Error { message, code } => AppAction::SetConnectionError {
            message,
            timestamp: now,
            is_critical: code == Some(critical_code),
        },

        TransportUpdate::Missed => AppAction::AddMissedReading,
    }
}

/// Drives a transport and feeds its updates into the store.
pub struct SensorConnector {
    transport: Box<dyn SensorTransport>,
    dispatcher: Dispatcher,
    critical_code: i32,
    update_capacity: usize,
}

impl SensorConnector {
    /// Create a connector over a transport driver.
    pub fn new(
        transport: Box<dyn SensorTransport>,
        dispatcher: Dispatcher,
        config: &CoreConfig,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            critical_code: config.critical_error_code,
            update_capacity: config.event_capacity,
        }
    }

    /// Pair with a new sensor and start pumping updates.
    pub async fn pair(&mut self) -> Result<()> {
        let updates = self.spawn_pump();
        info!("pairing sensor");
        self.transport.pair(updates).await
    }

    /// Connect to the given (or previously paired) sensor and start pumping
    /// updates.
    pub async fn connect(&mut self, sensor: Option<Sensor>) -> Result<()> {
        let updates = self.spawn_pump();
        info!(serial = sensor.as_ref().map(|s| s.serial.as_str()), "connecting sensor");
        self.transport.connect(sensor, updates).await
    }

    /// Disconnect the transport. The pump exits once the driver drops its
    /// update sender.
    pub async fn disconnect(&mut self) -> Result<()> {
        info!("disconnecting sensor");
        self.transport.disconnect().await
    }

    fn spawn_pump(&self) -> UpdateSender {
        let (tx, rx) = update_channel(self.update_capacity);
        let dispatcher = self.dispatcher.clone();
        let critical_code = self.critical_code;

        tokio::spawn(pump(rx, dispatcher, critical_code));
        tx
    }
}

/// Consume transport updates and dispatch one action per update.
async fn pump(mut updates: UpdateReceiver, dispatcher: Dispatcher, critical_code: i32) {
    while let Some(update) = updates.recv().await {
        debug!(?update, "transport update");

        let snapshot = dispatcher.current().await;
        let calibrator = Calibrator::from_points(&snapshot.calibration);
        let action = translate(
            update,
            snapshot.latest_glucose(),
            &calibrator,
            critical_code,
            OffsetDateTime::now_utc(),
        );

        if let Err(e) = dispatcher.dispatch(action) {
            warn!("dispatch failed, stopping update pump: {e}");
            break;
        }
    }

    debug!("transport update pump finished");
}
