//! Transport layer for broker communication
//!
//! This module provides the broker connection abstraction used by the
//! connection supervisor, and its MQTT implementation.

use async_trait::async_trait;

pub mod mqtt;

/// How a disconnect should be carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectMode {
    /// Send DISCONNECT with reason "normal disconnection" and wait for it to flush
    Graceful,
    /// Tear the session down without waiting
    Immediate,
}

/// Events emitted by a transport, drained by exactly one dispatcher
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The broker acknowledged a (re)connection
    Connected,
    /// The session ended, either broker or network initiated
    Disconnected { reason: String },
    /// Inbound application message on a subscribed topic
    Message { topic: String, payload: Vec<u8> },
}

/// Broker connection capability
///
/// Implementations own a single broker session and serialise their own
/// operations, so the connect/ping/publish paths may be called from the
/// reconnect loop, the event dispatcher and the publish façade concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a fresh broker session, replacing any previous one
    async fn connect(&self) -> Result<(), Self::Error>;

    /// Lightweight liveness check; `Ok(false)` means the session is gone
    async fn ping(&self) -> Result<bool, Self::Error>;

    /// Publish a payload to a topic
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool)
        -> Result<(), Self::Error>;

    /// Subscribe to a topic
    async fn subscribe(&self, topic: &str) -> Result<(), Self::Error>;

    /// Disconnect from the broker
    async fn disconnect(&self, mode: DisconnectMode) -> Result<(), Self::Error>;

    /// Check if transport is currently connected; must not block
    fn is_connected(&self) -> bool;
}
