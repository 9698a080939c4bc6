//! Third-party glucose-sharing export.
//!
//! Serializes accepted readings into the record format consumed by the
//! wider glucose-sharing ecosystem. The mapping is bit-exact for
//! interoperability: numeric value, the small integer trend code, a
//! millisecond-epoch timestamp wrapped in a fixed textual envelope, and a
//! textual direction label. Do not reorder or rename fields.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use glucolink_types::GlucoseReading;

use crate::action::AppAction;
use crate::middleware::{Middleware, MiddlewareContext};
use crate::state::AppState;

/// One glucose record in the shared export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedGlucoseRecord {
    /// Calibrated glucose value in mg/dL.
    #[serde(rename = "Value")]
    pub value: f64,
    /// Trend code, 0 = unknown, 1 = rapidly rising .. 7 = rapidly falling.
    #[serde(rename = "Trend")]
    pub trend: u8,
    /// Millisecond-epoch timestamp in the fixed `/Date(ms)/` envelope,
    /// truncated to whole seconds.
    #[serde(rename = "DT")]
    pub dt: String,
    /// Direction label from the fixed enumeration.
    #[serde(rename = "direction")]
    pub direction: String,
}

impl SharedGlucoseRecord {
    /// Build the shared record for a reading.
    #[must_use]
    pub fn from_reading(reading: &GlucoseReading) -> Self {
        // Whole-second truncation before widening to milliseconds.
        let millis = reading.timestamp.unix_timestamp() * 1000;

        Self {
            value: reading.glucose_value,
            trend: reading.trend.code(),
            dt: format!("/Date({millis})/"),
            direction: reading.trend.direction().to_string(),
        }
    }
}

/// Destination for exported records (app-group storage, remote endpoint).
#[async_trait]
pub trait SharedStorage: Send + Sync {
    /// Publish the latest batch of shared records.
    async fn publish(&self, records: Vec<SharedGlucoseRecord>);
}

/// Middleware exporting every accepted reading batch.
pub struct SharedExportMiddleware {
    storage: Arc<dyn SharedStorage>,
}

impl SharedExportMiddleware {
    /// Create the export middleware over a storage collaborator.
    pub fn new(storage: Arc<dyn SharedStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Middleware for SharedExportMiddleware {
    async fn handle(
        &self,
        _ctx: MiddlewareContext,
        action: AppAction,
        _before: Arc<AppState>,
        _after: Arc<AppState>,
    ) {
        if let AppAction::AddGlucose { readings } = action {
            if readings.is_empty() {
                return;
            }

            let records: Vec<SharedGlucoseRecord> =
                readings.iter().map(SharedGlucoseRecord::from_reading).collect();

            debug!(count = records.len(), "publishing shared glucose records");
            self.storage.publish(records).await;
        }
    }
}
