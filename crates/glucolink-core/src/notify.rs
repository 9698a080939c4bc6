//! Notification collaborator contract and badge middleware.
//!
//! The platform notification service is an injected collaborator behind
//! [`NotificationPort`], constructed once at startup and passed into the
//! pipeline by reference, so tests can substitute fakes. The badge middleware
//! publishes a passive, silent alert with the current calibrated value and
//! minute-change text after every accepted reading batch.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use glucolink_types::{GlucoseReading, GlucoseUnit};

use crate::action::AppAction;
use crate::middleware::{Middleware, MiddlewareContext};
use crate::state::AppState;

/// Platform notification service seam.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Display or update the badge with a passive, silent alert for the
    /// given reading, formatted in `unit`.
    async fn set_badge(&self, glucose: &GlucoseReading, unit: GlucoseUnit);

    /// Remove any delivered badge notification.
    async fn clear(&self);

    /// Stop a currently playing alarm sound. Idempotent.
    async fn stop_sound(&self);
}

/// Format the minute-over-minute change for notification text.
///
/// Unknown deltas render as `"?/min."`.
#[must_use]
pub fn minute_change_text(glucose: &GlucoseReading, unit: GlucoseUnit) -> String {
    match glucose.minute_change {
        Some(change) => {
            let formatted = match unit {
                GlucoseUnit::MgDl => format!("{change:+.0}"),
                GlucoseUnit::MmolL => format!("{:+.1}", unit.convert(change)),
            };
            format!("{formatted}/min.")
        }
        None => "?/min.".to_string(),
    }
}

/// Middleware publishing badge notifications for appended readings.
pub struct GlucoseBadgeMiddleware {
    port: Arc<dyn NotificationPort>,
}

impl GlucoseBadgeMiddleware {
    /// Create the badge middleware over a notification port.
    pub fn new(port: Arc<dyn NotificationPort>) -> Self {
        Self { port }
    }
}

#[async_trait]
impl Middleware for GlucoseBadgeMiddleware {
    async fn handle(
        &self,
        _ctx: MiddlewareContext,
        action: AppAction,
        _before: Arc<AppState>,
        after: Arc<AppState>,
    ) {
        match action {
            AppAction::AddGlucose { readings } => {
                // Badge the newest accepted reading. Duplicate delivery of
                // the same batch repeats the same idempotent badge update.
                if let Some(latest) = readings.last() {
                    debug!(value = latest.glucose_value, "updating glucose badge");
                    self.port.set_badge(latest, after.glucose_unit).await;
                }
            }
            AppAction::ClearGlucoseValues => {
                self.port.clear().await;
            }
            _ => {}
        }
    }
}
