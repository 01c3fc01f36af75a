//! Impure I/O operations for MQTT client
//!
//! This module handles all impure I/O operations including network communication,
//! async coordination, and integration with the rumqttc client.
//!
//! Each `connect()` builds a fresh rumqttc session and a task that drives its
//! event loop. The task never reconnects on its own: when the session dies it
//! reports `TransportEvent::Disconnected` and exits, and the connection
//! supervisor decides when to try again.

use super::connection::{
    configure_mqtt_options, determine_qos_level, resolve_credentials, ConnectionState, MqttError,
};
use super::health_monitor::{ConnectionEvent, HealthMonitor};
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::MqttSection;
use crate::transport::{DisconnectMode, Transport, TransportEvent};
use async_trait::async_trait;
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, EventLoop};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Request channel capacity between AsyncClient and its event loop
const REQUEST_CHANNEL_CAPACITY: usize = 10;
/// Bound on a single publish/subscribe enqueue
const OPERATION_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a graceful disconnect waits for the event loop to flush DISCONNECT
const DISCONNECT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// One live rumqttc session
struct Session {
    client: AsyncClient,
    event_loop_handle: JoinHandle<()>,
}

/// State shared between the client and its event loop task
struct SharedState {
    client_id: String,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    /// Bumped on every connect/disconnect; stale event loops stop reporting.
    /// Held while a state change or event is applied so retiring a session
    /// and reporting from it can't interleave.
    generation: std::sync::Mutex<u64>,
    last_inbound: std::sync::Mutex<Instant>,
}

impl SharedState {
    fn generation(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, event: &ConnectionEvent) {
        let from = *self.state_tx.borrow();
        let to = HealthMonitor::determine_next_state(from, event);
        HealthMonitor::log_state_transition(from, to, &self.client_id);
        let _ = self.state_tx.send(to);
    }

    /// Start a new generation and return it
    fn advance(&self) -> u64 {
        let mut generation = self.generation();
        *generation += 1;
        *generation
    }

    /// Apply a state transition if `generation` still owns the connection
    fn transition(&self, generation: u64, event: &ConnectionEvent) {
        let current = self.generation();
        if *current == generation {
            self.apply(event);
        }
    }

    /// Apply a final transition for `generation` and end it, so nothing
    /// its event loop reports afterwards is observed
    fn retire(&self, generation: u64, event: &ConnectionEvent) {
        let mut current = self.generation();
        if *current == generation {
            self.apply(event);
            *current += 1;
        }
    }

    /// Retire whichever generation owns the connection now
    fn retire_current(&self, event: &ConnectionEvent) {
        let mut current = self.generation();
        self.apply(event);
        *current += 1;
    }

    fn emit(&self, generation: u64, event: TransportEvent) {
        let current = self.generation();
        if *current != generation {
            return;
        }
        if self.events_tx.send(event).is_err() {
            debug!("Transport event receiver dropped");
        }
    }

    fn touch(&self) {
        if let Ok(mut last_inbound) = self.last_inbound.lock() {
            *last_inbound = Instant::now();
        }
    }

    fn last_inbound(&self) -> Instant {
        self.last_inbound
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|_| Instant::now())
    }
}

/// Event loop of a connect attempt that has not been confirmed yet.
///
/// Dropping it, including when the `connect()` future itself is dropped,
/// retires the attempt and aborts its event loop, so a late ConnAck can't
/// mark the client connected without a session.
struct PendingConnect {
    shared: Arc<SharedState>,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl PendingConnect {
    fn confirm(mut self) -> Option<JoinHandle<()>> {
        self.handle.take()
    }

    fn fail(mut self, reason: String) {
        self.abandon(reason);
    }

    fn abandon(&mut self, reason: String) {
        if let Some(handle) = self.handle.take() {
            self.shared
                .retire(self.generation, &ConnectionEvent::AttemptFailed(reason));
            handle.abort();
        }
    }
}

impl Drop for PendingConnect {
    fn drop(&mut self) {
        self.abandon("connect attempt cancelled".to_string());
    }
}

/// MQTT transport client for the temperature bridge
pub struct MqttClient {
    config: MqttSection,
    /// Serialises connect/publish/subscribe/disconnect against each other
    session: Mutex<Option<Session>>,
    state_rx: watch::Receiver<ConnectionState>,
    shared: Arc<SharedState>,
}

impl MqttClient {
    /// Create a disconnected client and the receiver for its transport events
    pub fn new(config: MqttSection) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(SharedState {
            client_id: config.client_id.clone(),
            state_tx,
            events_tx,
            generation: std::sync::Mutex::new(0),
            last_inbound: std::sync::Mutex::new(Instant::now()),
        });

        let client = MqttClient {
            config,
            session: Mutex::new(None),
            state_rx,
            shared,
        };
        (client, events_rx)
    }

    /// Get current connection state
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Check connection state before operations
    fn check_connection_state(&self) -> Result<(), MqttError> {
        let current_state = self.connection_state();
        if !HealthMonitor::can_publish(current_state) {
            return Err(MqttError::NotConnected {
                state: current_state,
            });
        }
        Ok(())
    }

    /// Drive one session's event loop until it ends
    async fn run_event_loop(
        shared: Arc<SharedState>,
        generation: u64,
        mut event_loop: EventLoop,
        mut ready_tx: Option<oneshot::Sender<Result<(), String>>>,
    ) {
        loop {
            match event_loop.poll().await {
                Ok(event) => {
                    let route = MessageHandler::route_mqtt_event(&event);
                    if route.is_inbound() {
                        shared.touch();
                    }

                    match route {
                        EventRoute::ConnectionAcknowledged => {
                            shared.transition(generation, &ConnectionEvent::ConnAckReceived);
                            if let Some(ready_tx) = ready_tx.take() {
                                let _ = ready_tx.send(Ok(()));
                            }
                            shared.emit(generation, TransportEvent::Connected);
                        }
                        EventRoute::MessageReceived { topic, payload } => {
                            debug!(target: "mqtt_transport", "Received MQTT message on topic: {}", topic);
                            shared.emit(generation, TransportEvent::Message { topic, payload });
                        }
                        EventRoute::Disconnected => {
                            shared.transition(generation, &ConnectionEvent::DisconnectedByBroker);
                            shared.emit(
                                generation,
                                TransportEvent::Disconnected {
                                    reason: "broker sent DISCONNECT".to_string(),
                                },
                            );
                            break;
                        }
                        EventRoute::InfrastructureEvent(event_str) => {
                            debug!(target: "mqtt_transport", "MQTT event: {}", event_str);
                        }
                        EventRoute::OutgoingEvent => {}
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    match ready_tx.take() {
                        // Never connected: connect() owns the failure
                        Some(ready_tx) => {
                            let _ = ready_tx.send(Err(reason));
                        }
                        None => {
                            shared.transition(generation, &ConnectionEvent::NetworkError(reason.clone()));
                            shared.emit(generation, TransportEvent::Disconnected { reason });
                        }
                    }
                    break;
                }
            }
        }
        debug!(target: "mqtt_transport", generation, "MQTT event loop stopped");
    }

    /// Tear down a session, optionally letting its event loop flush first
    async fn close_session(session: Session, flush: bool) {
        let Session {
            client,
            event_loop_handle: mut handle,
        } = session;
        // Closing the request channel lets the event loop drain and exit
        drop(client);

        if flush {
            if tokio::time::timeout(DISCONNECT_FLUSH_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                warn!("Event loop didn't shut down gracefully, forcing abort");
                handle.abort();
            }
        } else {
            handle.abort();
        }
    }
}

#[async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn connect(&self) -> Result<(), MqttError> {
        let mut session = self.session.lock().await;

        let generation = self.shared.advance();
        if let Some(previous) = session.take() {
            Self::close_session(previous, false).await;
        }
        self.shared
            .transition(generation, &ConnectionEvent::AttemptStarted);

        info!(
            server = %self.config.server,
            port = self.config.port,
            client_id = %self.config.client_id,
            "Connecting to MQTT broker"
        );

        let credentials = resolve_credentials(&self.config);
        let mqtt_options = configure_mqtt_options(&self.config, credentials.as_ref());
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);

        let (ready_tx, ready_rx) = oneshot::channel();
        let pending = PendingConnect {
            shared: self.shared.clone(),
            generation,
            handle: Some(tokio::spawn(Self::run_event_loop(
                self.shared.clone(),
                generation,
                event_loop,
                Some(ready_tx),
            ))),
        };

        let timeout = self.config.connect_timeout();
        let outcome = match tokio::time::timeout(timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(MqttError::ConnectionFailed(reason)),
            Ok(Err(_)) => Err(MqttError::ConnectionFailed(
                "event loop ended before ConnAck".to_string(),
            )),
            Err(_) => Err(MqttError::ConnectTimeout(self.config.connect_timeout_secs)),
        };

        match outcome {
            Ok(()) => {
                let Some(event_loop_handle) = pending.confirm() else {
                    return Err(MqttError::ConnectionFailed(
                        "event loop handle missing".to_string(),
                    ));
                };
                self.shared.touch();
                *session = Some(Session {
                    client,
                    event_loop_handle,
                });
                Ok(())
            }
            Err(e) => {
                pending.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn ping(&self) -> Result<bool, MqttError> {
        if !HealthMonitor::can_publish(self.connection_state()) {
            return Ok(false);
        }

        let session = self.session.lock().await;
        let alive = match session.as_ref() {
            None => false,
            Some(session) if session.event_loop_handle.is_finished() => false,
            Some(_) => !HealthMonitor::is_session_stale(
                self.shared.last_inbound(),
                Instant::now(),
                self.config.keep_alive(),
            ),
        };
        Ok(alive)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError> {
        let session = self.session.lock().await;
        self.check_connection_state()?;
        let session = session.as_ref().ok_or(MqttError::NotConnected {
            state: self.connection_state(),
        })?;

        let qos = determine_qos_level(retain);
        tokio::time::timeout(
            OPERATION_TIMEOUT,
            session.client.publish(topic, qos, retain, payload),
        )
        .await
        .map_err(|_| MqttError::Timeout("publish"))?
        .map_err(MqttError::PublishFailed)?;

        debug!(topic = %topic, retain, "Published MQTT message");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), MqttError> {
        let session = self.session.lock().await;
        self.check_connection_state()?;
        let session = session.as_ref().ok_or(MqttError::NotConnected {
            state: self.connection_state(),
        })?;

        tokio::time::timeout(
            OPERATION_TIMEOUT,
            session.client.subscribe(topic, QoS::AtLeastOnce),
        )
        .await
        .map_err(|_| MqttError::Timeout("subscribe"))?
        .map_err(MqttError::SubscriptionFailed)?;

        info!(topic = %topic, "Subscribed to topic");
        Ok(())
    }

    async fn disconnect(&self, mode: DisconnectMode) -> Result<(), MqttError> {
        let mut session = self.session.lock().await;

        // Retire the event loop so its shutdown isn't reported as a drop
        self.shared
            .retire_current(&ConnectionEvent::DisconnectRequested);

        let Some(current) = session.take() else {
            return Ok(());
        };

        let result = match mode {
            DisconnectMode::Graceful => tokio::time::timeout(OPERATION_TIMEOUT, current.client.disconnect())
                .await
                .map_err(|_| MqttError::Timeout("disconnect"))
                .and_then(|sent| sent.map_err(MqttError::DisconnectFailed)),
            DisconnectMode::Immediate => current
                .client
                .try_disconnect()
                .map_err(MqttError::DisconnectFailed),
        };

        Self::close_session(current, mode == DisconnectMode::Graceful).await;
        info!(client_id = %self.config.client_id, ?mode, "MQTT client disconnected");
        result
    }

    fn is_connected(&self) -> bool {
        HealthMonitor::can_publish(self.connection_state())
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // Abort the event loop task if it's still running
        if let Ok(mut session) = self.session.try_lock() {
            if let Some(session) = session.take() {
                session.event_loop_handle.abort();
            }
        }
    }
}
