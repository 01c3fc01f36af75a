//! Outbound bridge messages
//!
//! [`BridgePublisher`] knows every topic and payload the bridge emits and
//! performs exactly one best-effort publish per call: failures are logged
//! as warnings and reported as `false`, never raised.

use crate::protocol::{format_temperature, AnnouncePayload, PresenceState, TopicBuilder};
use crate::transport::Transport;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Publish façade consumed by the periodic driver
#[async_trait]
pub trait TelemetryPublisher: Send + Sync {
    /// Current liveness as observed by the underlying client; never blocks
    fn is_connected(&self) -> bool;

    /// Publish one reading; `false` when the broker did not take it
    async fn publish_temperature(&self, value: f64) -> bool;
}

/// Topic-aware publisher over a shared transport
pub struct BridgePublisher<T: Transport> {
    transport: Arc<T>,
    topics: TopicBuilder,
    announce: AnnouncePayload,
}

impl<T: Transport> BridgePublisher<T> {
    pub fn new(transport: Arc<T>, topics: TopicBuilder, announce: AnnouncePayload) -> Self {
        Self {
            transport,
            topics,
            announce,
        }
    }

    pub fn topics(&self) -> &TopicBuilder {
        &self.topics
    }

    /// Non-retained reading on `{base}/{client_id}/status/temperature`
    pub async fn publish_temperature(&self, value: f64) -> bool {
        let topic = self.topics.temperature();
        let payload = format_temperature(value);
        match self
            .transport
            .publish(&topic, payload.clone().into_bytes(), false)
            .await
        {
            Ok(()) => {
                debug!(topic = %topic, temperature = %payload, "Published temperature");
                true
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to publish temperature message to MQTT broker");
                false
            }
        }
    }

    /// Retained presence on `{base}/{client_id}/online`
    pub async fn publish_presence(&self, presence: PresenceState) -> bool {
        let topic = self.topics.online();
        match self
            .transport
            .publish(&topic, presence.as_payload().as_bytes().to_vec(), true)
            .await
        {
            Ok(()) => {
                debug!(topic = %topic, ?presence, "Published presence");
                true
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to send heartbeat message to MQTT broker");
                false
            }
        }
    }

    /// Non-retained identity on `{base}/announce`
    pub async fn publish_announce(&self) -> bool {
        let topic = self.topics.announce();
        let payload = match self.announce.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize announce payload");
                return false;
            }
        };

        match self
            .transport
            .publish(&topic, payload.into_bytes(), false)
            .await
        {
            Ok(()) => {
                debug!(topic = %topic, id = %self.announce.id, "Published announce");
                true
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to send announce message to MQTT broker");
                false
            }
        }
    }
}
