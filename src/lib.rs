//! pitempmqtt - one-wire temperature to MQTT bridge
//!
//! Periodically samples a thermometer and publishes the reading to an MQTT
//! broker, while keeping the broker session alive in the background.
//!
//! # Overview
//!
//! - [`bridge::ConnectionSupervisor`] owns the broker session: initial
//!   connect, a fixed-interval liveness check with reconnect, retained
//!   presence, announce on (re)connect, and the `announce` command.
//! - [`bridge::TelemetryPublisher`] is the façade the periodic job sees:
//!   `is_connected` and a single best-effort `publish_temperature`.
//! - [`jobs::TemperatureJob`] reads the sensor and publishes only when the
//!   session is live; [`jobs::schedule`] runs it on a fixed interval.
//!
//! # Topics
//!
//! | Topic | Payload | Retained |
//! |-------|---------|----------|
//! | `{base}/{client_id}/status/temperature` | `"23.50"` | no |
//! | `{base}/{client_id}/online` | `"true"` / `"false"` | yes |
//! | `{base}/announce` | `{"id","model","mac","ip"}` | no |
//! | `{base}/command` (subscribed) | `"announce"` | - |
//!
//! # Quick Start
//!
//! ```rust
//! use pitempmqtt::protocol::{format_temperature, TopicBuilder};
//!
//! let topics = TopicBuilder::new("home/sensors", "pitemp-kitchen");
//! assert_eq!(topics.temperature(), "home/sensors/pitemp-kitchen/status/temperature");
//! assert_eq!(format_temperature(21.0), "21.00");
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod jobs;
pub mod observability;
pub mod protocol;
pub mod sensor;
pub mod testing;
pub mod transport;

pub use bridge::{ConnectionSupervisor, SupervisorSettings, TelemetryPublisher};
pub use config::{BridgeConfig, ConfigError, MqttSection, SensorKind, SensorSection};
pub use error::{BridgeError, BridgeResult};
pub use transport::mqtt::MqttClient;
