//! MQTT client implementation for the temperature bridge
//!
//! This module separates pure functions from I/O operations for better
//! testability.
//!
//! # Architecture
//!
//! - [`connection`] - Pure connection state, options and error types
//! - [`message_handler`] - Pure event routing logic
//! - [`health_monitor`] - Pure state transition and liveness logic
//! - [`client`] - Impure I/O operations and coordination
//!
//! # Usage
//!
//! ```rust,no_run
//! use pitempmqtt::config::MqttSection;
//! use pitempmqtt::transport::mqtt::MqttClient;
//! use pitempmqtt::transport::Transport;
//!
//! # tokio_test::block_on(async {
//! let config = MqttSection {
//!     server: "localhost".to_string(),
//!     port: 1883,
//!     client_id: "pitemp-kitchen".to_string(),
//!     topic: "home/sensors".to_string(),
//!     username_env: None,
//!     password_env: None,
//!     keep_alive_secs: 30,
//!     connect_timeout_secs: 10,
//!     reconnect_interval_secs: 5,
//! };
//!
//! let (client, _events) = MqttClient::new(config);
//! client.connect().await?;
//! client.publish("home/sensors/pitemp-kitchen/status/temperature", b"21.50".to_vec(), false).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

pub mod client;
pub mod connection;
pub mod health_monitor;
pub mod message_handler;

// Re-export public types for convenience
pub use client::MqttClient;
pub use connection::{ConnectionState, Credentials, MqttError};
pub use health_monitor::{ConnectionEvent, HealthMonitor};
pub use message_handler::{EventRoute, MessageHandler};
