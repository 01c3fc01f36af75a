//! Broker connection supervision
//!
//! The `ConnectionSupervisor` owns the broker connection for the lifetime of
//! the process:
//! - an initial best-effort connect, then a liveness check every
//!   reconnect interval that reconnects when the ping fails
//! - retained presence, announce and command subscription after every
//!   successful (re)connection, in that order
//! - dispatch of inbound command messages
//! - ordered shutdown: offline presence first, disconnect second
//!
//! Retries are unbounded at a fixed interval; there is no backoff.

use super::commands::CommandHandler;
use super::publisher::{BridgePublisher, TelemetryPublisher};
use crate::config::MqttSection;
use crate::protocol::{AnnouncePayload, PresenceState, TopicBuilder};
use crate::transport::{DisconnectMode, Transport, TransportEvent};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Supervisor lifecycle errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Supervisor already started")]
    AlreadyStarted,
}

/// Static inputs for one supervisor
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub topics: TopicBuilder,
    pub announce: AnnouncePayload,
    pub reconnect_interval: Duration,
}

impl SupervisorSettings {
    pub fn from_config(config: &MqttSection) -> Self {
        Self {
            topics: TopicBuilder::new(&config.topic, &config.client_id),
            // Controllers expect the broker host in the ip field
            announce: AnnouncePayload::for_device(&config.client_id, &config.server),
            reconnect_interval: config.reconnect_interval(),
        }
    }
}

/// Outcome of one liveness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessDecision {
    Healthy,
    Reconnect(String),
}

impl LivenessDecision {
    /// Pure decision from a ping result
    pub fn from_ping<E: std::fmt::Display>(ping: &Result<bool, E>) -> Self {
        match ping {
            Ok(true) => LivenessDecision::Healthy,
            Ok(false) => LivenessDecision::Reconnect("not connected".to_string()),
            Err(e) => LivenessDecision::Reconnect(format!("ping failed: {e}")),
        }
    }
}

/// Background tasks owned by a started supervisor
#[derive(Default)]
struct Tasks {
    reconnect_loop: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

/// Maintains the broker connection and reacts to its events
pub struct ConnectionSupervisor<T: Transport + 'static> {
    transport: Arc<T>,
    publisher: Arc<BridgePublisher<T>>,
    commands: Arc<CommandHandler<T>>,
    reconnect_interval: Duration,
    shutdown: CancellationToken,
    events: std::sync::Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    tasks: tokio::sync::Mutex<Tasks>,
}

impl<T: Transport + 'static> ConnectionSupervisor<T> {
    /// `cancel` is the host's shutdown signal; the supervisor stops its
    /// background work when it fires or when `stop()` is called.
    pub fn new(
        settings: SupervisorSettings,
        transport: Arc<T>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        cancel: &CancellationToken,
    ) -> Self {
        let publisher = Arc::new(BridgePublisher::new(
            transport.clone(),
            settings.topics,
            settings.announce,
        ));
        let commands = Arc::new(CommandHandler::new(publisher.clone()));

        Self {
            transport,
            publisher,
            commands,
            reconnect_interval: settings.reconnect_interval,
            shutdown: cancel.child_token(),
            events: std::sync::Mutex::new(Some(events)),
            tasks: tokio::sync::Mutex::new(Tasks::default()),
        }
    }

    /// Launch the event dispatcher and the reconnect loop.
    ///
    /// Returns as soon as both tasks are spawned; the first connect attempt
    /// runs inside the reconnect loop.
    pub async fn start(&self) -> Result<(), SupervisorError> {
        let events = self
            .events
            .lock()
            .ok()
            .and_then(|mut events| events.take())
            .ok_or(SupervisorError::AlreadyStarted)?;

        info!("Connection supervisor starting...");

        let mut tasks = self.tasks.lock().await;
        tasks.dispatcher = Some(tokio::spawn(Self::run_event_dispatcher(
            events,
            self.transport.clone(),
            self.publisher.clone(),
            self.commands.clone(),
            self.shutdown.clone(),
        )));
        tasks.reconnect_loop = Some(tokio::spawn(Self::run_reconnect_loop(
            self.transport.clone(),
            self.reconnect_interval,
            self.shutdown.clone(),
        )));

        info!("Connection supervisor started");
        Ok(())
    }

    /// Stop background work and leave the broker.
    ///
    /// Offline presence is published while still connected, before any
    /// disconnect. `cancelled` selects a graceful DISCONNECT ("normal
    /// disconnection"); otherwise the session is torn down if still up.
    pub async fn stop(&self, cancelled: bool) {
        self.shutdown.cancel();
        self.join_tasks().await;

        if self.transport.is_connected() {
            self.publisher.publish_presence(PresenceState::Offline).await;
        }

        info!("Connection supervisor stopping...");
        if cancelled {
            if let Err(e) = self.transport.disconnect(DisconnectMode::Graceful).await {
                warn!(error = %e, "Graceful disconnect failed");
            }
        }
        if self.transport.is_connected() {
            if let Err(e) = self.transport.disconnect(DisconnectMode::Immediate).await {
                warn!(error = %e, "Disconnect failed");
            }
        }
        info!("Connection supervisor stopped");
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    async fn join_tasks(&self) {
        let mut tasks = self.tasks.lock().await;
        for (name, handle) in [
            ("reconnect loop", tasks.reconnect_loop.take()),
            ("event dispatcher", tasks.dispatcher.take()),
        ] {
            if let Some(handle) = handle {
                if let Err(e) = handle.await {
                    error!(task = name, error = %e, "Supervisor task ended abnormally");
                }
            }
        }
    }

    /// Connect once, then check liveness every interval until cancelled
    async fn run_reconnect_loop(
        transport: Arc<T>,
        interval: Duration,
        shutdown: CancellationToken,
    ) {
        info!(
            interval_secs = interval.as_secs(),
            "Reconnect loop started"
        );

        Self::run_guarded(Self::try_connect(transport.clone(), shutdown.clone())).await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            Self::run_guarded(Self::check_liveness(transport.clone(), shutdown.clone())).await;
        }

        info!("Reconnect loop stopped");
    }

    /// Run one iteration on its own task so a panic can't end the loop
    async fn run_guarded<F>(iteration: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if let Err(e) = tokio::spawn(iteration).await {
            error!(error = %e, "Reconnect iteration failed");
        }
    }

    async fn check_liveness(transport: Arc<T>, shutdown: CancellationToken) {
        let ping = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            ping = transport.ping() => ping,
        };

        match LivenessDecision::from_ping(&ping) {
            LivenessDecision::Healthy => debug!("MQTT connection alive"),
            LivenessDecision::Reconnect(reason) => {
                info!(reason = %reason, "MQTT connection not alive, reconnecting");
                Self::try_connect(transport, shutdown).await;
            }
        }
    }

    async fn try_connect(transport: Arc<T>, shutdown: CancellationToken) {
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            result = transport.connect() => result,
        };

        match result {
            Ok(()) => info!("The MQTT client is connected."),
            Err(e) => error!(error = %e, "The MQTT client connection failed"),
        }
    }

    /// Drain transport events one at a time, in arrival order
    async fn run_event_dispatcher(
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        transport: Arc<T>,
        publisher: Arc<BridgePublisher<T>>,
        commands: Arc<CommandHandler<T>>,
        shutdown: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                TransportEvent::Connected => {
                    Self::on_connected(&transport, &publisher).await;
                }
                TransportEvent::Disconnected { reason } => {
                    info!(reason = %reason, "MQTT client disconnected from server");
                }
                TransportEvent::Message { topic, payload } => {
                    commands.handle(&topic, &payload).await;
                }
            }
        }
        debug!("Event dispatcher stopped");
    }

    /// Presence, announce, then subscribe; each step is best effort
    async fn on_connected(transport: &Arc<T>, publisher: &Arc<BridgePublisher<T>>) {
        info!(
            client_id = %publisher.topics().client_id(),
            "MQTT client connected to server"
        );
        publisher.publish_presence(PresenceState::Online).await;
        publisher.publish_announce().await;

        let command_topic = publisher.topics().command();
        if let Err(e) = transport.subscribe(&command_topic).await {
            warn!(topic = %command_topic, error = %e, "Failed to subscribe to command topic");
        }
    }
}

#[async_trait]
impl<T: Transport + 'static> TelemetryPublisher for ConnectionSupervisor<T> {
    fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    async fn publish_temperature(&self, value: f64) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                debug!("Shutdown in progress, dropping temperature publish");
                false
            }
            published = self.publisher.publish_temperature(value) => published,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mqtt::MqttError;

    #[test]
    fn test_liveness_decision() {
        assert_eq!(
            LivenessDecision::from_ping::<MqttError>(&Ok(true)),
            LivenessDecision::Healthy
        );
        assert!(matches!(
            LivenessDecision::from_ping::<MqttError>(&Ok(false)),
            LivenessDecision::Reconnect(_)
        ));
        assert!(matches!(
            LivenessDecision::from_ping(&Err(MqttError::Timeout("ping"))),
            LivenessDecision::Reconnect(reason) if reason.contains("ping")
        ));
    }

    #[test]
    fn test_settings_from_config() {
        let config = crate::config::BridgeConfig::test_config();
        let settings = SupervisorSettings::from_config(&config.mqtt);
        assert_eq!(settings.reconnect_interval, Duration::from_secs(5));
        assert_eq!(settings.topics.command(), "home/sensors/command");
        assert_eq!(settings.announce.id, "pitemp-test");
        assert_eq!(settings.announce.ip, "localhost");
    }
}
