//! Temperature sources
//!
//! The bridge samples one thermometer through the [`TemperatureSensor`]
//! capability. Two implementations ship: a one-wire reader for DS18B20 style
//! devices under the Linux w1 sysfs tree, and a simulated source for hosts
//! without hardware.

use crate::config::{SensorKind, SensorSection};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub mod one_wire;
pub mod simulated;

pub use one_wire::OneWireSensor;
pub use simulated::SimulatedSensor;

/// Sensor errors
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("No one-wire thermometer device found under {0}")]
    NoDevice(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CRC check failed for {0}")]
    CrcMismatch(PathBuf),
    #[error("Invalid reading from {path}: {reason}")]
    InvalidReading { path: PathBuf, reason: String },
    #[error("Sensor task failed: {0}")]
    TaskFailed(String),
}

/// Single blocking read of a Celsius value
#[async_trait]
pub trait TemperatureSensor: Send + Sync {
    async fn read_temperature(&self) -> Result<f64, SensorError>;
}

/// Build the configured sensor
pub fn from_config(config: &SensorSection) -> Arc<dyn TemperatureSensor> {
    match config.kind {
        SensorKind::OneWire => Arc::new(OneWireSensor::new(&config.device_dir)),
        SensorKind::Simulated => Arc::new(SimulatedSensor::new()),
    }
}
