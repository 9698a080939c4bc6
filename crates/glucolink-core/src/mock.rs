//! Mock transport implementation for testing.
//!
//! This module provides a scripted transport driver that can be used for
//! unit and integration testing without real sensor hardware.
//!
//! The [`MockTransport`] implements the [`SensorTransport`] trait, allowing
//! it to be used interchangeably with real drivers in generic code.
//!
//! # Features
//!
//! - **Scripted updates**: Queue the exact [`TransportUpdate`] sequence a
//!   pair or connect session should deliver
//! - **Failure injection**: Make pair/connect/disconnect return errors
//! - **Inspection**: A cloneable handle exposes link state and call counts

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use glucolink_types::{ConnectionState, Sensor};

use crate::connector::{SensorTransport, TransportUpdate, UpdateSender};
use crate::error::{Error, Result};

/// Shared view into a [`MockTransport`] for test assertions.
///
/// Stays valid after the transport has been boxed and handed to a
/// [`SensorConnector`](crate::connector::SensorConnector).
#[derive(Clone, Default)]
pub struct MockTransportHandle {
    linked: Arc<AtomicBool>,
    pair_count: Arc<AtomicU32>,
    connect_count: Arc<AtomicU32>,
    disconnect_count: Arc<AtomicU32>,
}

impl MockTransportHandle {
    /// Whether the mock link is currently up.
    pub fn is_linked(&self) -> bool {
        self.linked.load(Ordering::SeqCst)
    }

    /// Number of `pair` calls observed.
    pub fn pair_count(&self) -> u32 {
        self.pair_count.load(Ordering::SeqCst)
    }

    /// Number of `connect` calls observed.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Number of `disconnect` calls observed.
    pub fn disconnect_count(&self) -> u32 {
        self.disconnect_count.load(Ordering::SeqCst)
    }
}

/// A scripted sensor transport for testing.
///
/// Each `pair` or `connect` call replays its queued update script on a
/// background task and then drops the sender, which lets the connector pump
/// finish deterministically.
pub struct MockTransport {
    pair_script: Vec<TransportUpdate>,
    connect_script: Vec<TransportUpdate>,
    fail_message: Option<String>,
    handle: MockTransportHandle,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("pair_script", &self.pair_script.len())
            .field("connect_script", &self.connect_script.len())
            .field("linked", &self.handle.is_linked())
            .finish()
    }
}

impl MockTransport {
    /// Create a mock transport with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        MockTransportBuilder::new().build()
    }

    /// Create a builder for a scripted transport.
    #[must_use]
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::new()
    }

    /// Get an inspection handle that outlives boxing.
    #[must_use]
    pub fn handle(&self) -> MockTransportHandle {
        self.handle.clone()
    }

    fn check_should_fail(&self) -> Result<()> {
        match &self.fail_message {
            Some(message) => Err(Error::transport(message.clone())),
            None => Ok(()),
        }
    }

    fn replay(&self, script: Vec<TransportUpdate>, updates: UpdateSender) {
        let linked = Arc::clone(&self.handle.linked);

        tokio::spawn(async move {
            for update in script {
                if updates.send(update).await.is_err() {
                    debug!("mock update receiver dropped, stopping replay");
                    break;
                }
            }
            linked.store(false, Ordering::SeqCst);
            // Sender drops here, ending the consumer's pump.
        });
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorTransport for MockTransport {
    async fn pair(&mut self, updates: UpdateSender) -> Result<()> {
        self.handle.pair_count.fetch_add(1, Ordering::SeqCst);
        self.check_should_fail()?;

        self.handle.linked.store(true, Ordering::SeqCst);
        self.replay(self.pair_script.clone(), updates);
        Ok(())
    }

    async fn connect(&mut self, sensor: Option<Sensor>, updates: UpdateSender) -> Result<()> {
        self.handle.connect_count.fetch_add(1, Ordering::SeqCst);
        self.check_should_fail()?;

        debug!(serial = sensor.as_ref().map(|s| s.serial.as_str()), "mock connect");
        self.handle.linked.store(true, Ordering::SeqCst);
        self.replay(self.connect_script.clone(), updates);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.handle.disconnect_count.fetch_add(1, Ordering::SeqCst);
        self.check_should_fail()?;

        self.handle.linked.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Builder for scripted mock transports.
#[derive(Debug, Default)]
#[must_use]
pub struct MockTransportBuilder {
    pair_script: Vec<TransportUpdate>,
    connect_script: Vec<TransportUpdate>,
    fail_message: Option<String>,
}

impl MockTransportBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one update to the pairing script.
    pub fn on_pair(mut self, update: TransportUpdate) -> Self {
        self.pair_script.push(update);
        self
    }

    /// Append one update to the connect script.
    pub fn on_connect(mut self, update: TransportUpdate) -> Self {
        self.connect_script.push(update);
        self
    }

    /// Append a whole connect script in delivery order.
    pub fn connect_script(mut self, updates: impl IntoIterator<Item = TransportUpdate>) -> Self {
        self.connect_script.extend(updates);
        self
    }

    /// Make every transport operation fail with the given message.
    pub fn fail_with(mut self, message: &str) -> Self {
        self.fail_message = Some(message.to_string());
        self
    }

    /// Build the mock transport.
    pub fn build(self) -> MockTransport {
        MockTransport {
            pair_script: self.pair_script,
            connect_script: self.connect_script,
            fail_message: self.fail_message,
            handle: MockTransportHandle::default(),
        }
    }
}

/// Convenience scripts used across tests.
impl MockTransportBuilder {
    /// Script a plain successful connect session: scanning, connecting,
    /// connected.
    pub fn with_link_sequence(self) -> Self {
        self.on_connect(TransportUpdate::ConnectionState(ConnectionState::Scanning))
            .on_connect(TransportUpdate::ConnectionState(ConnectionState::Connecting))
            .on_connect(TransportUpdate::ConnectionState(ConnectionState::Connected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::update_channel;

    #[tokio::test]
    async fn test_mock_replays_connect_script_in_order() {
        let mut transport = MockTransport::builder().with_link_sequence().build();
        let (tx, mut rx) = update_channel(8);

        transport.connect(None, tx).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(TransportUpdate::ConnectionState(ConnectionState::Scanning))
        );
        assert_eq!(
            rx.recv().await,
            Some(TransportUpdate::ConnectionState(ConnectionState::Connecting))
        );
        assert_eq!(
            rx.recv().await,
            Some(TransportUpdate::ConnectionState(ConnectionState::Connected))
        );
        // Script exhausted: sender dropped, channel closes.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let mut transport = MockTransport::builder().fail_with("no adapter").build();
        let handle = transport.handle();
        let (tx, _rx) = update_channel(8);

        let result = transport.connect(None, tx).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no adapter"));
        assert!(!handle.is_linked());
        assert_eq!(handle.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_handle_counts_calls() {
        let mut transport = MockTransport::new();
        let handle = transport.handle();

        let (tx, _rx) = update_channel(8);
        transport.pair(tx).await.unwrap();
        let (tx, _rx) = update_channel(8);
        transport.connect(None, tx).await.unwrap();
        transport.disconnect().await.unwrap();

        assert_eq!(handle.pair_count(), 1);
        assert_eq!(handle.connect_count(), 1);
        assert_eq!(handle.disconnect_count(), 1);
        assert!(!handle.is_linked());
    }
}
