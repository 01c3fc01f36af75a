//! Pure health monitoring logic for the MQTT client
//!
//! This module contains pure functions for connection state transitions
//! and session staleness detection.

use super::connection::ConnectionState;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Pure health monitoring decision logic
pub struct HealthMonitor;

impl HealthMonitor {
    /// Determine next state after connection event (pure function)
    pub fn determine_next_state(
        current_state: ConnectionState,
        event: &ConnectionEvent,
    ) -> ConnectionState {
        match event {
            ConnectionEvent::AttemptStarted => ConnectionState::Connecting,
            // Only the attempt in progress may complete
            ConnectionEvent::ConnAckReceived => match current_state {
                ConnectionState::Connecting => ConnectionState::Connected,
                other => other,
            },
            ConnectionEvent::AttemptFailed(_)
            | ConnectionEvent::DisconnectedByBroker
            | ConnectionEvent::NetworkError(_)
            | ConnectionEvent::DisconnectRequested => ConnectionState::Disconnected,
        }
    }

    /// Check if connection state allows publishing (pure function)
    pub fn can_publish(state: ConnectionState) -> bool {
        matches!(state, ConnectionState::Connected)
    }

    /// A session is stale when nothing, not even a PINGRESP, arrived for two
    /// keep-alive periods. A zero keep-alive disables the check.
    pub fn is_session_stale(last_inbound: Instant, now: Instant, keep_alive: Duration) -> bool {
        if keep_alive.is_zero() {
            return false;
        }
        now.saturating_duration_since(last_inbound) > keep_alive * 2
    }

    /// Log connection state transition (pure logging function)
    pub fn log_state_transition(from: ConnectionState, to: ConnectionState, client_id: &str) {
        match (from, to) {
            (ConnectionState::Connecting, ConnectionState::Connected) => {
                info!(client_id = %client_id, "MQTT connection established");
            }
            (ConnectionState::Connected, ConnectionState::Disconnected) => {
                warn!(client_id = %client_id, "MQTT connection lost");
            }
            (ConnectionState::Connecting, ConnectionState::Disconnected) => {
                warn!(client_id = %client_id, "MQTT connect attempt failed");
            }
            (from, to) if from != to => {
                info!(client_id = %client_id, "MQTT connection state: {:?} -> {:?}", from, to);
            }
            _ => {}
        }
    }
}

/// Connection events that drive state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A new connect attempt began
    AttemptStarted,
    /// Broker acknowledged the connection
    ConnAckReceived,
    /// Connect attempt failed or timed out
    AttemptFailed(String),
    /// Broker sent DISCONNECT
    DisconnectedByBroker,
    /// Event loop reported an I/O or protocol error
    NetworkError(String),
    /// Local side asked to disconnect
    DisconnectRequested,
}
