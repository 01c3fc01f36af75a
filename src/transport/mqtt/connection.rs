//! Pure connection state management for MQTT client
//!
//! This module contains pure functions for connection state management
//! and broker option construction.

use crate::config::MqttSection;
use crate::protocol::{PresenceState, TopicBuilder};
use rumqttc::v5::mqttbytes::v5::LastWill;
use rumqttc::v5::{mqttbytes::QoS, MqttOptions};
use thiserror::Error;

/// Connection state for MQTT client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session, or the last one ended
    #[default]
    Disconnected,
    /// A connect attempt is in flight
    Connecting,
    /// ConnAck received, session usable
    Connected,
}

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Connection attempt timed out after {0}s")]
    ConnectTimeout(u64),
    #[error("Publishing failed")]
    PublishFailed(#[source] rumqttc::v5::ClientError),
    #[error("Subscription failed")]
    SubscriptionFailed(#[source] rumqttc::v5::ClientError),
    #[error("Disconnect failed")]
    DisconnectFailed(#[source] rumqttc::v5::ClientError),
    #[error("Operation timed out: {0}")]
    Timeout(&'static str),
    #[error("Not connected - current state: {state:?}")]
    NotConnected { state: ConnectionState },
}

/// Resolved broker credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Pure function to configure MQTT options from config
pub fn configure_mqtt_options(
    config: &MqttSection,
    credentials: Option<&Credentials>,
) -> MqttOptions {
    let mut mqtt_options =
        MqttOptions::new(config.client_id.clone(), config.server.clone(), config.port);

    if let Some(credentials) = credentials {
        mqtt_options.set_credentials(&credentials.username, &credentials.password);
    }

    mqtt_options.set_keep_alive(config.keep_alive());

    // Broker marks the bridge offline if the session drops without a DISCONNECT
    let topics = TopicBuilder::new(&config.topic, &config.client_id);
    let lwt = LastWill::new(
        topics.online(),
        PresenceState::Offline.as_payload(),
        QoS::AtLeastOnce,
        true,
        None,
    );
    mqtt_options.set_last_will(lwt);

    mqtt_options
}

/// Resolve credentials from the environment variables named in the config.
/// A missing password with a present username yields an empty password.
pub fn resolve_credentials(config: &MqttSection) -> Option<Credentials> {
    let username_env = config.username_env.as_ref()?;
    let username = std::env::var(username_env).ok()?;
    let password = config
        .password_env
        .as_ref()
        .and_then(|env_name| std::env::var(env_name).ok())
        .unwrap_or_default();
    Some(Credentials { username, password })
}

/// QoS for a publish; retained presence must reach the broker
pub fn determine_qos_level(retain: bool) -> QoS {
    match retain {
        true => QoS::AtLeastOnce,
        false => QoS::AtMostOnce,
    }
}
