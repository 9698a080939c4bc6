//! Core types for CGM sensor telemetry.

use core::fmt;

use time::OffsetDateTime;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Trend classification of a glucose reading.
///
/// The discriminants are the small integer codes used by the shared export
/// format and must stay bit-exact: `0` is unknown, `1` through `7` run from
/// rapidly rising to rapidly falling, monotonic with trend severity.
///
/// # Examples
///
/// ```
/// use glucolink_types::Trend;
///
/// assert_eq!(Trend::RapidlyRising.code(), 1);
/// assert_eq!(Trend::Constant.direction(), "Flat");
/// assert_eq!(Trend::try_from(7), Ok(Trend::RapidlyFalling));
/// assert!(Trend::try_from(8).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Trend {
    /// No trend information available.
    Unknown = 0,
    /// Rising faster than 3 mg/dL per minute.
    RapidlyRising = 1,
    /// Rising 2-3 mg/dL per minute.
    FastRising = 2,
    /// Rising 1-2 mg/dL per minute.
    Rising = 3,
    /// Stable, within 1 mg/dL per minute.
    Constant = 4,
    /// Falling 1-2 mg/dL per minute.
    Falling = 5,
    /// Falling 2-3 mg/dL per minute.
    FastFalling = 6,
    /// Falling faster than 3 mg/dL per minute.
    RapidlyFalling = 7,
}

impl Trend {
    /// Numeric code used by the shared export format.
    #[must_use]
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Textual direction label used by the shared export format.
    ///
    /// The labels are drawn from a fixed enumeration understood by the
    /// consuming ecosystem and must not be altered.
    #[must_use]
    pub fn direction(&self) -> &'static str {
        match self {
            Trend::RapidlyRising => "DoubleUp",
            Trend::FastRising => "SingleUp",
            Trend::Rising => "FortyFiveUp",
            Trend::Constant => "Flat",
            Trend::Falling => "FortyFiveDown",
            Trend::FastFalling => "SingleDown",
            Trend::RapidlyFalling => "DoubleDown",
            Trend::Unknown => "NONE",
        }
    }

    /// Classify a minute-over-minute delta in mg/dL into a trend.
    #[must_use]
    pub fn from_minute_change(change: f64) -> Self {
        match change {
            c if c > 3.0 => Trend::RapidlyRising,
            c if c > 2.0 => Trend::FastRising,
            c if c > 1.0 => Trend::Rising,
            c if c >= -1.0 => Trend::Constant,
            c if c >= -2.0 => Trend::Falling,
            c if c >= -3.0 => Trend::FastFalling,
            _ => Trend::RapidlyFalling,
        }
    }
}

impl TryFrom<u8> for Trend {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Trend::Unknown),
            1 => Ok(Trend::RapidlyRising),
            2 => Ok(Trend::FastRising),
            3 => Ok(Trend::Rising),
            4 => Ok(Trend::Constant),
            5 => Ok(Trend::Falling),
            6 => Ok(Trend::FastFalling),
            7 => Ok(Trend::RapidlyFalling),
            _ => Err(ParseError::UnknownTrendCode(value)),
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Unknown => write!(f, "unknown"),
            Trend::RapidlyRising => write!(f, "rapidly rising"),
            Trend::FastRising => write!(f, "fast rising"),
            Trend::Rising => write!(f, "rising"),
            Trend::Constant => write!(f, "constant"),
            Trend::Falling => write!(f, "falling"),
            Trend::FastFalling => write!(f, "fast falling"),
            Trend::RapidlyFalling => write!(f, "rapidly falling"),
        }
    }
}

/// Display unit for glucose values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GlucoseUnit {
    /// Milligrams per deciliter (raw sensor unit).
    #[default]
    MgDl,
    /// Millimoles per liter.
    MmolL,
}

impl GlucoseUnit {
    /// Conversion factor from mg/dL to mmol/L.
    pub const MMOL_PER_MGDL: f64 = 0.0555;

    /// Convert a mg/dL value into this unit.
    #[must_use]
    pub fn convert(&self, mgdl: f64) -> f64 {
        match self {
            GlucoseUnit::MgDl => mgdl,
            GlucoseUnit::MmolL => mgdl * Self::MMOL_PER_MGDL,
        }
    }

    /// Format a mg/dL value in this unit, without the unit suffix.
    ///
    /// mg/dL values are whole numbers, mmol/L values keep one decimal.
    #[must_use]
    pub fn format_value(&self, mgdl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => format!("{:.0}", mgdl),
            GlucoseUnit::MmolL => format!("{:.1}", self.convert(mgdl)),
        }
    }
}

impl fmt::Display for GlucoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlucoseUnit::MgDl => write!(f, "mg/dL"),
            GlucoseUnit::MmolL => write!(f, "mmol/L"),
        }
    }
}

/// A single accepted glucose reading.
///
/// Readings are immutable once created: the calibrated value is fixed at
/// ingestion time and is not recomputed when calibration points change later.
/// The id is stable across transport retries so duplicate delivery can be
/// detected downstream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlucoseReading {
    /// Unique, retry-stable identifier.
    pub id: Uuid,
    /// When the sensor produced the value.
    pub timestamp: OffsetDateTime,
    /// Raw sensor value in mg/dL before calibration.
    pub raw_value: f64,
    /// Calibrated glucose value in mg/dL.
    pub glucose_value: f64,
    /// Trend classification.
    pub trend: Trend,
    /// Minute-over-minute delta in mg/dL, if a prior reading was available.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub minute_change: Option<f64>,
}

impl GlucoseReading {
    /// Create a builder for constructing a `GlucoseReading`.
    pub fn builder() -> GlucoseReadingBuilder {
        GlucoseReadingBuilder::default()
    }
}

/// Builder for constructing [`GlucoseReading`] with optional fields.
#[derive(Debug)]
#[must_use]
pub struct GlucoseReadingBuilder {
    reading: GlucoseReading,
}

impl Default for GlucoseReadingBuilder {
    fn default() -> Self {
        Self {
            reading: GlucoseReading {
                id: Uuid::new_v4(),
                timestamp: OffsetDateTime::UNIX_EPOCH,
                raw_value: 0.0,
                glucose_value: 0.0,
                trend: Trend::Unknown,
                minute_change: None,
            },
        }
    }
}

impl GlucoseReadingBuilder {
    /// Set the identifier (defaults to a fresh v4 UUID).
    pub fn id(mut self, id: Uuid) -> Self {
        self.reading.id = id;
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.reading.timestamp = timestamp;
        self
    }

    /// Set the raw sensor value.
    pub fn raw_value(mut self, raw: f64) -> Self {
        self.reading.raw_value = raw;
        self
    }

    /// Set the calibrated glucose value.
    pub fn glucose_value(mut self, value: f64) -> Self {
        self.reading.glucose_value = value;
        self
    }

    /// Set the trend classification.
    pub fn trend(mut self, trend: Trend) -> Self {
        self.reading.trend = trend;
        self
    }

    /// Set the minute-over-minute delta.
    pub fn minute_change(mut self, change: f64) -> Self {
        self.reading.minute_change = Some(change);
        self
    }

    /// Build the `GlucoseReading`.
    #[must_use]
    pub fn build(self) -> GlucoseReading {
        self.reading
    }
}

/// A user-supplied calibration point.
///
/// Pairs a raw sensor value with a reference measurement (typically a blood
/// glucose meter value). Points are retained only while a sensor session is
/// active.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationPoint {
    /// Unique identifier.
    pub id: Uuid,
    /// Raw sensor value at the time of the reference measurement.
    pub x: f64,
    /// Reference glucose value.
    pub y: f64,
}

impl CalibrationPoint {
    /// Create a new calibration point with a fresh identifier.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
        }
    }
}

/// Lifecycle state of a sensor, as reported by the transport driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorLifecycle {
    /// State not yet reported.
    #[default]
    Unknown,
    /// Warm-up period after activation.
    Starting,
    /// Producing valid readings.
    Ready,
    /// Past its wear duration.
    Expired,
    /// Hardware or signal failure.
    Failed,
    /// Session ended by the user.
    Terminated,
}

impl fmt::Display for SensorLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorLifecycle::Unknown => write!(f, "unknown"),
            SensorLifecycle::Starting => write!(f, "starting"),
            SensorLifecycle::Ready => write!(f, "ready"),
            SensorLifecycle::Expired => write!(f, "expired"),
            SensorLifecycle::Failed => write!(f, "failed"),
            SensorLifecycle::Terminated => write!(f, "terminated"),
        }
    }
}

/// A physical CGM sensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sensor {
    /// Serial identifier printed on the sensor.
    pub serial: String,
    /// Age in minutes since the sensor was started.
    pub age_minutes: u32,
    /// Lifecycle state.
    pub lifecycle: SensorLifecycle,
    /// When the sensor session started, if known.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub start: Option<OffsetDateTime>,
}

impl Sensor {
    /// Create a sensor with an unknown lifecycle and no start timestamp.
    #[must_use]
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            age_minutes: 0,
            lifecycle: SensorLifecycle::Unknown,
            start: None,
        }
    }
}

/// An optional external transmitter relaying sensor data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transmitter {
    /// Transmitter name.
    pub name: String,
    /// Battery level percentage (0-100), if reported.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub battery: Option<u8>,
    /// Firmware version, if reported.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub firmware: Option<String>,
    /// Hardware revision, if reported.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub hardware: Option<String>,
}

/// Link status of the sensor connection.
///
/// # Resettable states
///
/// Entering one of the resettable states clears any previously recorded
/// connection error. This is a deliberate policy tied to the transition
/// itself, not to the error's age.
///
/// ```
/// use glucolink_types::ConnectionState;
///
/// assert!(ConnectionState::Connected.is_resettable());
/// assert!(!ConnectionState::Connecting.is_resettable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionState {
    /// No link and no activity.
    #[default]
    Disconnected,
    /// Searching for the sensor or transmitter.
    Scanning,
    /// Link establishment in progress.
    Connecting,
    /// Pairing completed, link not yet up.
    Paired,
    /// Link established and delivering updates.
    Connected,
    /// Radio powered off.
    PowerOff,
    /// Link in an error state.
    Error,
}

impl ConnectionState {
    /// Whether entering this state clears a recorded connection error.
    #[must_use]
    pub fn is_resettable(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::PowerOff | ConnectionState::Scanning
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Scanning => write!(f, "scanning"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Paired => write!(f, "paired"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::PowerOff => write!(f, "power off"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}
