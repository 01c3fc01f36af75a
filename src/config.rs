//! Bridge configuration system
//!
//! Configuration is read from a TOML file with an `[mqtt]` section describing
//! the broker session and a `[sensor]` section describing how and how often
//! the temperature is sampled. Credentials never live in the file; only the
//! names of the environment variables that hold them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Main bridge configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    pub mqtt: MqttSection,
    #[serde(default)]
    pub sensor: SensorSection,
}

/// MQTT section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker host name or address
    pub server: String,
    /// Broker TCP port (default: 1883)
    #[serde(default = "default_port")]
    pub port: u16,
    /// MQTT client identifier, also the device id in announce messages
    pub client_id: String,
    /// Base topic every published topic is built under
    pub topic: String,
    /// Environment variable containing username
    pub username_env: Option<String>,
    /// Environment variable containing password
    pub password_env: Option<String>,
    /// MQTT keep-alive in seconds (default: 30)
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Upper bound for one connect attempt in seconds (default: 10)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Liveness check / reconnect interval in seconds (default: 5)
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_secs: u64,
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_reconnect_interval() -> u64 {
    5
}

/// Which temperature source the bridge samples
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// DS18B20 style thermometer exposed through the Linux w1 sysfs tree
    #[default]
    OneWire,
    /// Random readings, for hosts without a thermometer attached
    Simulated,
}

/// Sensor section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorSection {
    /// Seconds between two temperature reads (default: 30)
    #[serde(default = "default_read_interval")]
    pub read_interval_secs: u64,
    #[serde(default)]
    pub kind: SensorKind,
    /// Root of the one-wire device tree
    #[serde(default = "default_device_dir")]
    pub device_dir: String,
}

impl Default for SensorSection {
    fn default() -> Self {
        Self {
            read_interval_secs: default_read_interval(),
            kind: SensorKind::default(),
            device_dir: default_device_dir(),
        }
    }
}

fn default_read_interval() -> u64 {
    30
}

fn default_device_dir() -> String {
    "/sys/bus/w1/devices".to_string()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid client ID format: {0}")]
    InvalidClientId(String),
    #[error("Invalid base topic: {0}")]
    InvalidTopic(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Values layered over the file, from the command line or environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub read_interval_secs: Option<u64>,
}

impl BridgeConfig {
    /// Apply overrides, then re-validate the result
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(server) = &overrides.server {
            self.mqtt.server = server.clone();
        }
        if let Some(port) = overrides.port {
            self.mqtt.port = port;
        }
        if let Some(client_id) = &overrides.client_id {
            self.mqtt.client_id = client_id.clone();
        }
        if let Some(secs) = overrides.read_interval_secs {
            self.sensor.read_interval_secs = secs;
        }
        self.validate()
    }

    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field that cannot be expressed through serde defaults
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.server.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "mqtt.server must not be empty".to_string(),
            ));
        }
        validate_client_id(&self.mqtt.client_id)?;
        validate_base_topic(&self.mqtt.topic)?;

        if self.mqtt.reconnect_interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "mqtt.reconnect_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.mqtt.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "mqtt.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.sensor.read_interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "sensor.read_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn read_interval(&self) -> Duration {
        Duration::from_secs(self.sensor.read_interval_secs)
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[mqtt]
server = "localhost"
client_id = "pitemp-test"
topic = "home/sensors"

[sensor]
kind = "simulated"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

impl MqttSection {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

/// Client IDs double as topic levels, so they must match [a-zA-Z0-9._-]+
fn validate_client_id(client_id: &str) -> Result<(), ConfigError> {
    let valid_chars = client_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if client_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidClientId(format!(
            "Client ID '{client_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}

fn validate_base_topic(topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::InvalidTopic("base topic is empty".to_string()));
    }
    if topic.contains(['+', '#']) {
        return Err(ConfigError::InvalidTopic(format!(
            "'{topic}' must not contain wildcards"
        )));
    }
    if topic.ends_with('/') {
        return Err(ConfigError::InvalidTopic(format!(
            "'{topic}' must not end with '/'"
        )));
    }
    Ok(())
}
