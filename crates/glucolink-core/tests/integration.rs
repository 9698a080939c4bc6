//! Integration tests for glucolink-core
//!
//! These tests drive the full pipeline with a scripted mock transport:
//! transport updates flow through the connector pump into the store, the
//! reducer applies them, and middleware observe the results. No sensor
//! hardware is required.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use glucolink_core::{
    AppAction, AppState, CoreConfig, GlucoseBadgeMiddleware, GlucoseReading, GlucoseUnit,
    MockTransport, NotificationPort, RawReading, SensorConnector, SharedExportMiddleware,
    SharedGlucoseRecord, SharedStorage, Store, TransportUpdate, Trend, CRITICAL_ERROR_CODE,
};
use glucolink_types::{ConnectionState, Sensor, SensorLifecycle};

/// How long to wait for asynchronous pipeline stages to settle.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Install a test subscriber once so failures come with trace output
/// (`RUST_LOG=glucolink_core=debug` to raise verbosity).
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Poll the store until `predicate` holds for the current snapshot.
///
/// Panics if the predicate never holds within [`SETTLE_TIMEOUT`].
async fn wait_for<F>(store: &Store, predicate: F) -> Arc<AppState>
where
    F: Fn(&AppState) -> bool,
{
    init_tracing();
    let deadline = tokio::time::Instant::now() + SETTLE_TIMEOUT;

    loop {
        let snapshot = store.current().await;
        if predicate(&snapshot) {
            return snapshot;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("pipeline did not settle within {SETTLE_TIMEOUT:?}: {snapshot:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn raw(offset_minutes: i64, value: f64) -> RawReading {
    RawReading::new(
        OffsetDateTime::now_utc() + time::Duration::minutes(offset_minutes),
        value,
    )
}

// =============================================================================
// Connection and readings flow
// =============================================================================

#[tokio::test]
async fn test_connect_pipeline_delivers_readings_and_link_state() {
    let transport = MockTransport::builder()
        .with_link_sequence()
        .on_connect(TransportUpdate::Sensor {
            sensor: Sensor::new("SN-100"),
            keep_device: false,
        })
        .on_connect(TransportUpdate::SensorState {
            age_minutes: 120,
            lifecycle: Some(SensorLifecycle::Ready),
        })
        .on_connect(TransportUpdate::Readings {
            trend: vec![raw(0, 100.0), raw(1, 103.0)],
            history: vec![],
        })
        .build();

    let store = Store::builder(CoreConfig::default()).spawn();
    let mut connector =
        SensorConnector::new(Box::new(transport), store.dispatcher(), &CoreConfig::default());

    connector.connect(None).await.unwrap();

    let state = wait_for(&store, |s| s.glucose_values.len() == 2).await;

    assert_eq!(state.connection_state, ConnectionState::Connected);

    let sensor = state.sensor.as_ref().unwrap();
    assert_eq!(sensor.serial, "SN-100");
    assert_eq!(sensor.age_minutes, 120);
    assert_eq!(sensor.lifecycle, SensorLifecycle::Ready);
    assert!(sensor.start.is_some());

    // Second reading derives its delta from the first.
    assert_eq!(state.glucose_values[1].minute_change, Some(3.0));
    assert_eq!(state.glucose_values[1].trend, Trend::FastRising);

    store.shutdown().await;
}

#[tokio::test]
async fn test_history_cap_holds_under_large_batches() {
    let config = CoreConfig {
        glucose_history_limit: 3,
        ..CoreConfig::default()
    };

    let transport = MockTransport::builder()
        .on_connect(TransportUpdate::Readings {
            trend: vec![raw(3, 103.0), raw(4, 104.0)],
            history: vec![raw(0, 100.0), raw(1, 101.0), raw(2, 102.0)],
        })
        .build();

    let store = Store::builder(config.clone()).spawn();
    let mut connector = SensorConnector::new(Box::new(transport), store.dispatcher(), &config);

    connector.connect(None).await.unwrap();

    let state = wait_for(&store, |s| !s.glucose_values.is_empty()).await;

    // Five arrived, the three newest survive, oldest first.
    let raws: Vec<f64> = state.glucose_values.iter().map(|r| r.raw_value).collect();
    assert_eq!(raws, vec![102.0, 103.0, 104.0]);

    store.shutdown().await;
}

#[tokio::test]
async fn test_missed_cycles_then_reading_resets_counter() {
    let transport = MockTransport::builder()
        .on_connect(TransportUpdate::Missed)
        .on_connect(TransportUpdate::Missed)
        .on_connect(TransportUpdate::NextReading(raw(0, 98.0)))
        .build();

    let store = Store::builder(CoreConfig::default()).spawn();
    let mut connector =
        SensorConnector::new(Box::new(transport), store.dispatcher(), &CoreConfig::default());

    connector.connect(None).await.unwrap();

    let state = wait_for(&store, |s| s.glucose_values.len() == 1).await;

    assert_eq!(state.missed_readings, 0);
    assert_eq!(state.glucose_values[0].raw_value, 98.0);

    store.shutdown().await;
}

// =============================================================================
// Error classification and recovery
// =============================================================================

#[tokio::test]
async fn test_critical_error_code_is_stored_as_critical() {
    let transport = MockTransport::builder()
        .on_connect(TransportUpdate::Error {
            message: "illegal adapter state".into(),
            code: Some(CRITICAL_ERROR_CODE),
        })
        .build();

    let store = Store::builder(CoreConfig::default()).spawn();
    let mut connector =
        SensorConnector::new(Box::new(transport), store.dispatcher(), &CoreConfig::default());

    connector.connect(None).await.unwrap();

    let state = wait_for(&store, |s| s.connection_error.is_some()).await;

    let error = state.connection_error.as_ref().unwrap();
    assert!(error.is_critical);
    assert_eq!(error.message, "illegal adapter state");

    store.shutdown().await;
}

#[tokio::test]
async fn test_reconnect_clears_recoverable_error() {
    let transport = MockTransport::builder()
        .on_connect(TransportUpdate::Error {
            message: "link dropped".into(),
            code: None,
        })
        .on_connect(TransportUpdate::ConnectionState(ConnectionState::Connected))
        .build();

    let store = Store::builder(CoreConfig::default()).spawn();
    let mut connector =
        SensorConnector::new(Box::new(transport), store.dispatcher(), &CoreConfig::default());

    connector.connect(None).await.unwrap();

    let state = wait_for(&store, |s| s.connection_state == ConnectionState::Connected).await;

    assert!(state.connection_error.is_none());

    store.shutdown().await;
}

// =============================================================================
// Calibration flow
// =============================================================================

#[tokio::test]
async fn test_calibration_reference_shifts_subsequent_readings() {
    let transport = MockTransport::builder()
        .on_connect(TransportUpdate::NextReading(raw(10, 100.0)))
        .build();

    let store = Store::builder(CoreConfig::default()).spawn();
    let dispatcher = store.dispatcher();

    // One observed reading, then a meter reference of 110 for its raw value.
    dispatcher
        .dispatch(AppAction::AddGlucose {
            readings: vec![GlucoseReading::builder()
                .timestamp(OffsetDateTime::now_utc())
                .raw_value(100.0)
                .glucose_value(100.0)
                .build()],
        })
        .unwrap();
    dispatcher
        .dispatch(AppAction::AddCalibration { value: 110.0 })
        .unwrap();
    store.drain().await;

    let state = store.current().await;
    assert_eq!(state.calibration.len(), 1);

    let mut connector =
        SensorConnector::new(Box::new(transport), dispatcher, &CoreConfig::default());
    connector.connect(None).await.unwrap();

    // Single reference point: slope one, intercept +10.
    let state = wait_for(&store, |s| s.glucose_values.len() == 2).await;
    assert_eq!(state.glucose_values[1].raw_value, 100.0);
    assert_eq!(state.glucose_values[1].glucose_value, 110.0);

    store.shutdown().await;
}

// =============================================================================
// Middleware fan-out
// =============================================================================

#[derive(Default)]
struct RecordingStorage {
    published: Mutex<Vec<Vec<SharedGlucoseRecord>>>,
}

#[async_trait]
impl SharedStorage for RecordingStorage {
    async fn publish(&self, records: Vec<SharedGlucoseRecord>) {
        self.published.lock().unwrap().push(records);
    }
}

#[derive(Default)]
struct RecordingPort {
    badges: Mutex<Vec<f64>>,
}

#[async_trait]
impl NotificationPort for RecordingPort {
    async fn set_badge(&self, glucose: &GlucoseReading, _unit: GlucoseUnit) {
        self.badges.lock().unwrap().push(glucose.glucose_value);
    }
    async fn clear(&self) {}
    async fn stop_sound(&self) {}
}

#[tokio::test]
async fn test_readings_fan_out_to_export_and_badge_middleware() {
    let storage = Arc::new(RecordingStorage::default());
    let port = Arc::new(RecordingPort::default());

    let transport = MockTransport::builder()
        .on_connect(TransportUpdate::NextReading(raw(0, 121.0)))
        .build();

    let store = Store::builder(CoreConfig::default())
        .with_middleware(Arc::new(SharedExportMiddleware::new(storage.clone())))
        .with_middleware(Arc::new(GlucoseBadgeMiddleware::new(port.clone())))
        .spawn();

    let mut connector =
        SensorConnector::new(Box::new(transport), store.dispatcher(), &CoreConfig::default());
    connector.connect(None).await.unwrap();

    wait_for(&store, |s| s.glucose_values.len() == 1).await;
    store.drain().await;

    let published = storage.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0][0].value, 121.0);
    drop(published);

    assert_eq!(*port.badges.lock().unwrap(), vec![121.0]);

    store.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_stops_mock_link() {
    let transport = MockTransport::builder().with_link_sequence().build();
    let handle = transport.handle();

    let store = Store::builder(CoreConfig::default()).spawn();
    let mut connector =
        SensorConnector::new(Box::new(transport), store.dispatcher(), &CoreConfig::default());

    connector.connect(None).await.unwrap();
    wait_for(&store, |s| s.connection_state == ConnectionState::Connected).await;

    connector.disconnect().await.unwrap();
    assert!(!handle.is_linked());
    assert_eq!(handle.disconnect_count(), 1);

    store.shutdown().await;
}
