//! Platform-agnostic types for CGM sensor telemetry.
//!
//! This crate provides the shared domain vocabulary used by glucolink-core:
//! readings, calibration points, sensor and transmitter descriptions, and the
//! connection state enumeration. It has no async machinery and no transport
//! dependencies, so it can be reused by any frontend or driver crate.
//!
//! # Example
//!
//! ```
//! use glucolink_types::{GlucoseReading, Trend};
//! use time::OffsetDateTime;
//!
//! let reading = GlucoseReading::builder()
//!     .timestamp(OffsetDateTime::UNIX_EPOCH)
//!     .raw_value(124.0)
//!     .glucose_value(118.0)
//!     .trend(Trend::Constant)
//!     .build();
//!
//! assert_eq!(reading.trend.direction(), "Flat");
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    CalibrationPoint, ConnectionState, GlucoseReading, GlucoseUnit, Sensor, SensorLifecycle,
    Transmitter, Trend,
};
