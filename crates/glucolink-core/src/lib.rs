//! Core telemetry pipeline for continuous glucose monitors.
//!
//! This crate turns raw sensor transport updates into an ordered, bounded
//! history of calibrated glucose readings behind a single serialized store.
//!
//! # Features
//!
//! - **Serialized dispatch**: One writer task applies actions in order and
//!   publishes immutable state snapshots
//! - **Calibration**: Least-squares mapping from raw sensor values to
//!   display values, recomputed as reference points change
//! - **Bounded history**: Oldest readings are evicted past a configured cap
//! - **Connection tracking**: Link state, pairing identity, and two-tier
//!   error classification from any transport driver
//! - **Middleware pipeline**: Interceptors observe every action with
//!   before/after snapshots and may dispatch follow-ups
//! - **Sharing export**: Bit-exact record format for the wider
//!   glucose-sharing ecosystem
//!
//! # Quick Start
//!
//! ```no_run
//! use glucolink_core::{AppAction, CoreConfig, Store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::builder(CoreConfig::default()).spawn();
//!     let dispatcher = store.dispatcher();
//!
//!     dispatcher.dispatch(AppAction::Startup)?;
//!     dispatcher.dispatch(AppAction::SetAlarmHigh { limit: 200.0 })?;
//!     store.drain().await;
//!
//!     let state = store.current().await;
//!     println!("alarm high: {}", state.alarm_high);
//!
//!     store.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod calibration;
pub mod config;
pub mod connector;
pub mod error;
pub mod export;
pub mod history;
pub mod middleware;
pub mod mock;
pub mod notify;
pub mod reducer;
pub mod state;
pub mod store;

// Core exports
pub use action::{AppAction, Effect};
pub use calibration::Calibrator;
pub use config::{CoreConfig, CRITICAL_ERROR_CODE};
pub use connector::{
    build_readings, update_channel, RawReading, SensorConnector, SensorTransport, TransportUpdate,
    UpdateReceiver, UpdateSender,
};
pub use error::{Error, Result};
pub use export::{SharedExportMiddleware, SharedGlucoseRecord, SharedStorage};
pub use middleware::{Middleware, MiddlewareContext};
pub use mock::{MockTransport, MockTransportBuilder, MockTransportHandle};
pub use notify::{minute_change_text, GlucoseBadgeMiddleware, NotificationPort};
pub use state::{AppState, ConnectionError};
pub use store::{Dispatcher, Store, StoreBuilder};

// Re-export from glucolink-types
pub use glucolink_types::{
    CalibrationPoint, ConnectionState, GlucoseReading, GlucoseUnit, Sensor, SensorLifecycle,
    Transmitter, Trend,
};
