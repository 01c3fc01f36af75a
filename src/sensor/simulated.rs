//! Simulated thermometer for hosts without one-wire hardware

use super::{SensorError, TemperatureSensor};
use async_trait::async_trait;
use rand::Rng;

/// Lower bound of simulated readings (inclusive)
const MIN_CELSIUS: i32 = -10;
/// Upper bound of simulated readings (exclusive)
const MAX_CELSIUS: i32 = 35;

/// Uniform readings in `[-10, 35)` °C
#[derive(Debug, Default)]
pub struct SimulatedSensor;

impl SimulatedSensor {
    pub fn new() -> Self {
        Self
    }

    fn sample() -> f64 {
        let mut rng = rand::thread_rng();
        let whole = rng.gen_range(MIN_CELSIUS..MAX_CELSIUS);
        f64::from(whole) + rng.gen::<f64>()
    }
}

#[async_trait]
impl TemperatureSensor for SimulatedSensor {
    async fn read_temperature(&self) -> Result<f64, SensorError> {
        Ok(Self::sample())
    }
}
