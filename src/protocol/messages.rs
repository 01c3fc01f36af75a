//! Wire message types for the bridge
//!
//! Payloads on the wire are plain text except for announce, which is a JSON
//! object. Formatting here is locale independent: Rust's float formatting
//! always uses `.` as the decimal separator.

use serde::{Deserialize, Serialize};

/// Sensor model reported in announce messages
pub const SENSOR_MODEL: &str = "DS18B20";

/// Placeholder MAC address. The bridge does not read the hardware address;
/// consumers must not rely on this field to identify a device.
pub const PLACEHOLDER_MAC: &str = "000000000000";

/// Identity record broadcast on connect and on the `announce` command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnouncePayload {
    pub id: String,
    pub model: String,
    pub mac: String,
    pub ip: String,
}

impl AnnouncePayload {
    /// Identity for a bridge with the given client id, reachable via `host`
    pub fn for_device(client_id: &str, host: &str) -> Self {
        Self {
            id: client_id.to_string(),
            model: SENSOR_MODEL.to_string(),
            mac: PLACEHOLDER_MAC.to_string(),
            ip: host.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Commands accepted on `{base}/command`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Re-publish the device identity
    Announce,
    /// Anything else; ignored so newer controllers can't break older bridges
    Unknown(String),
}

impl Command {
    /// Interpret a payload as a single command token
    pub fn parse(payload: &str) -> Self {
        match payload {
            "announce" => Command::Announce,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Retained presence value on `{base}/{client_id}/online`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Online,
    Offline,
}

impl PresenceState {
    pub fn as_payload(&self) -> &'static str {
        match self {
            PresenceState::Online => "true",
            PresenceState::Offline => "false",
        }
    }
}

/// Format a Celsius reading with exactly two fraction digits
pub fn format_temperature(value: f64) -> String {
    format!("{value:.2}")
}
