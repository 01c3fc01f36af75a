//! Mock implementations for testing
//!
//! Provides mock Transport, TemperatureSensor and TelemetryPublisher
//! implementations so the supervisor and the periodic job can be exercised
//! without a broker or thermometer hardware.

use crate::bridge::TelemetryPublisher;
use crate::sensor::{SensorError, TemperatureSensor};
use crate::transport::{DisconnectMode, Transport, TransportEvent};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors produced by [`MockTransport`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MockError {
    #[error("Mock connection failure")]
    ConnectFailed,
    #[error("Mock publish failure")]
    PublishFailed,
    #[error("Mock transport not connected")]
    NotConnected,
    #[error("Mock ping failure")]
    PingFailed,
}

/// One recorded transport call, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    Connect,
    Publish {
        topic: String,
        payload: String,
        retain: bool,
    },
    Subscribe(String),
    Disconnect(DisconnectMode),
}

impl TransportOp {
    pub fn publish(topic: &str, payload: &str, retain: bool) -> Self {
        TransportOp::Publish {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        }
    }
}

/// A message accepted by the mock broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

/// In-memory transport recording every call
///
/// A successful `connect` flips the connection flag and emits
/// [`TransportEvent::Connected`], the same way a broker ConnAck does.
/// `ping` replays scripted results first, then reports the connection flag.
#[derive(Debug)]
pub struct MockTransport {
    ops: Mutex<Vec<TransportOp>>,
    connected: AtomicBool,
    connect_attempts: AtomicUsize,
    remaining_connect_failures: AtomicUsize,
    fail_publish: AtomicBool,
    pings: Mutex<VecDeque<Result<bool, MockError>>>,
    ping_count: AtomicUsize,
    panic_on_ping: AtomicBool,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MockTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        Self::with_connect_failures(0)
    }

    /// The first `failures` connect attempts are refused
    pub fn with_connect_failures(
        failures: usize,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            ops: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            connect_attempts: AtomicUsize::new(0),
            remaining_connect_failures: AtomicUsize::new(failures),
            fail_publish: AtomicBool::new(false),
            pings: Mutex::new(VecDeque::new()),
            ping_count: AtomicUsize::new(0),
            panic_on_ping: AtomicBool::new(false),
            events,
        };
        (transport, rx)
    }

    pub fn ops(&self) -> Vec<TransportOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                TransportOp::Publish {
                    topic,
                    payload,
                    retain,
                } => Some(PublishedMessage {
                    topic,
                    payload,
                    retain,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn set_publish_failure(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Queue results for the next `ping` calls, in order
    pub fn script_pings(&self, results: Vec<Result<bool, MockError>>) {
        if let Ok(mut pings) = self.pings.lock() {
            pings.extend(results);
        }
    }

    /// Make the next `ping` call panic, once
    pub fn panic_on_next_ping(&self) {
        self.panic_on_ping.store(true, Ordering::SeqCst);
    }

    pub fn ping_count(&self) -> usize {
        self.ping_count.load(Ordering::SeqCst)
    }

    /// Drop the session as if the broker went away
    pub fn simulate_disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.events.send(TransportEvent::Disconnected {
            reason: "simulated network loss".to_string(),
        });
    }

    /// Deliver an inbound message to the dispatcher
    pub fn inject_message(&self, topic: &str, payload: &str) {
        let _ = self.events.send(TransportEvent::Message {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
        });
    }

    fn record(&self, op: TransportOp) {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = MockError;

    async fn connect(&self) -> Result<(), Self::Error> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        self.record(TransportOp::Connect);

        let refused = self
            .remaining_connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(MockError::ConnectFailed);
        }

        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events.send(TransportEvent::Connected);
        Ok(())
    }

    async fn ping(&self) -> Result<bool, Self::Error> {
        self.ping_count.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_ping.swap(false, Ordering::SeqCst) {
            panic!("mock ping panicked");
        }

        let scripted = self.pings.lock().ok().and_then(|mut pings| pings.pop_front());
        scripted.unwrap_or_else(|| Ok(self.is_connected()))
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> Result<(), Self::Error> {
        if !self.is_connected() {
            return Err(MockError::NotConnected);
        }
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(MockError::PublishFailed);
        }

        self.record(TransportOp::Publish {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(&payload).into_owned(),
            retain,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), Self::Error> {
        if !self.is_connected() {
            return Err(MockError::NotConnected);
        }
        self.record(TransportOp::Subscribe(topic.to_string()));
        Ok(())
    }

    async fn disconnect(&self, mode: DisconnectMode) -> Result<(), Self::Error> {
        self.record(TransportOp::Disconnect(mode));
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Sensor replaying scripted readings; repeats the last one when exhausted
#[derive(Debug)]
pub struct MockSensor {
    readings: Mutex<VecDeque<Result<f64, String>>>,
    reads: AtomicUsize,
}

impl MockSensor {
    pub fn new(readings: Vec<Result<f64, String>>) -> Self {
        Self {
            readings: Mutex::new(readings.into()),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(vec![Ok(value)])
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemperatureSensor for MockSensor {
    async fn read_temperature(&self) -> Result<f64, SensorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let next = match self.readings.lock() {
            Ok(mut readings) => {
                if readings.len() > 1 {
                    readings.pop_front()
                } else {
                    readings.front().cloned()
                }
            }
            Err(_) => None,
        };

        match next {
            Some(Ok(value)) => Ok(value),
            Some(Err(reason)) => Err(SensorError::NoDevice(reason)),
            None => Err(SensorError::NoDevice("no scripted reading".to_string())),
        }
    }
}

/// Publish façade stub counting calls
#[derive(Debug, Default)]
pub struct MockPublisher {
    connected: AtomicBool,
    accept: AtomicBool,
    publish_calls: AtomicUsize,
    values: Mutex<Vec<f64>>,
}

impl MockPublisher {
    pub fn connected() -> Self {
        Self {
            connected: AtomicBool::new(true),
            accept: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Whether `publish_temperature` reports success
    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    pub fn values(&self) -> Vec<f64> {
        self.values
            .lock()
            .map(|values| values.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TelemetryPublisher for MockPublisher {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish_temperature(&self, value: f64) -> bool {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut values) = self.values.lock() {
            values.push(value);
        }
        self.accept.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_connect_failures() {
        let (transport, mut events) = MockTransport::with_connect_failures(2);

        assert_eq!(transport.connect().await, Err(MockError::ConnectFailed));
        assert_eq!(transport.connect().await, Err(MockError::ConnectFailed));
        assert!(transport.connect().await.is_ok());
        assert!(transport.is_connected());
        assert_eq!(transport.connect_attempts(), 3);
        assert_eq!(events.try_recv().ok(), Some(TransportEvent::Connected));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_mock_transport_publish_requires_connection() {
        let (transport, _events) = MockTransport::new();
        assert_eq!(
            transport.publish("a/b", b"x".to_vec(), false).await,
            Err(MockError::NotConnected)
        );

        transport.connect().await.unwrap();
        transport.publish("a/b", b"x".to_vec(), true).await.unwrap();
        assert_eq!(
            transport.published(),
            vec![PublishedMessage {
                topic: "a/b".to_string(),
                payload: "x".to_string(),
                retain: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_transport_scripted_pings() {
        let (transport, _events) = MockTransport::new();
        transport.connect().await.unwrap();
        transport.script_pings(vec![Err(MockError::PingFailed), Ok(false)]);

        assert_eq!(transport.ping().await, Err(MockError::PingFailed));
        assert_eq!(transport.ping().await, Ok(false));
        // Script exhausted, back to the connection flag
        assert_eq!(transport.ping().await, Ok(true));
        assert_eq!(transport.ping_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_transport_panics_once() {
        let (transport, _events) = MockTransport::new();
        let transport = std::sync::Arc::new(transport);
        transport.panic_on_next_ping();

        let pinger = transport.clone();
        let outcome = tokio::spawn(async move { pinger.ping().await }).await;
        assert!(outcome.unwrap_err().is_panic());

        assert_eq!(transport.ping().await, Ok(false));
        assert_eq!(transport.ping_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_sensor_script() {
        let sensor = MockSensor::new(vec![Ok(20.0), Err("unplugged".to_string()), Ok(21.0)]);
        assert_eq!(sensor.read_temperature().await.unwrap(), 20.0);
        assert!(sensor.read_temperature().await.is_err());
        assert_eq!(sensor.read_temperature().await.unwrap(), 21.0);
        assert_eq!(sensor.read_temperature().await.unwrap(), 21.0);
        assert_eq!(sensor.read_count(), 4);
    }
}
