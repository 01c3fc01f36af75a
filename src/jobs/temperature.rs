//! Periodic temperature job
//!
//! One run reads the sensor and, when the broker connection is live, hands
//! the reading to the publish façade. Every successful read is published;
//! the cached last-known value only drives change logging.

use super::scheduler::Job;
use crate::bridge::TelemetryPublisher;
use crate::protocol::format_temperature;
use crate::sensor::TemperatureSensor;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Change worth an info-level log line, in °C
pub const SIGNIFICANT_CHANGE_CELSIUS: f64 = 0.5;

/// Last reading that was considered significant
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LastKnownTemperature(Option<f64>);

impl LastKnownTemperature {
    pub fn value(&self) -> Option<f64> {
        self.0
    }

    /// Record a reading; returns true when it is the first one or moved by
    /// at least [`SIGNIFICANT_CHANGE_CELSIUS`] from the cached value.
    pub fn observe(&mut self, reading: f64) -> bool {
        let significant = match self.0 {
            None => true,
            Some(last) => (reading - last).abs() >= SIGNIFICANT_CHANGE_CELSIUS,
        };
        if significant {
            self.0 = Some(reading);
        }
        significant
    }
}

/// Result of a single job run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Published,
    PublishFailed,
    SkippedDisconnected,
    SensorFailed,
}

pub struct TemperatureJob<P: TelemetryPublisher> {
    sensor: Arc<dyn TemperatureSensor>,
    publisher: Arc<P>,
    last_known: LastKnownTemperature,
}

impl<P: TelemetryPublisher> TemperatureJob<P> {
    pub fn new(sensor: Arc<dyn TemperatureSensor>, publisher: Arc<P>) -> Self {
        Self {
            sensor,
            publisher,
            last_known: LastKnownTemperature::default(),
        }
    }

    pub fn last_known(&self) -> LastKnownTemperature {
        self.last_known
    }

    pub async fn run_once(&mut self) -> JobOutcome {
        let reading = match self.sensor.read_temperature().await {
            Ok(reading) => reading,
            Err(e) => {
                error!(error = %e, "Failed to read temperature");
                return JobOutcome::SensorFailed;
            }
        };

        if self.last_known.observe(reading) {
            info!(temperature = %format_temperature(reading), "Temperature changed");
        } else {
            debug!(temperature = %format_temperature(reading), "Temperature read");
        }

        if !self.publisher.is_connected() {
            warn!("MQTT client not connected, skipping temperature publish");
            return JobOutcome::SkippedDisconnected;
        }

        if self.publisher.publish_temperature(reading).await {
            JobOutcome::Published
        } else {
            JobOutcome::PublishFailed
        }
    }
}

#[async_trait]
impl<P: TelemetryPublisher + 'static> Job for TemperatureJob<P> {
    fn name(&self) -> &str {
        "temperature"
    }

    async fn execute(&mut self) {
        let outcome = self.run_once().await;
        debug!(?outcome, "Temperature job finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPublisher, MockSensor};

    #[test]
    fn test_first_reading_is_significant() {
        let mut last = LastKnownTemperature::default();
        assert!(last.observe(21.0));
        assert_eq!(last.value(), Some(21.0));
    }

    #[test]
    fn test_small_changes_do_not_move_cache() {
        let mut last = LastKnownTemperature::default();
        last.observe(21.0);

        assert!(!last.observe(21.3));
        assert!(!last.observe(20.7));
        assert_eq!(last.value(), Some(21.0));

        assert!(last.observe(21.5));
        assert_eq!(last.value(), Some(21.5));
        assert!(last.observe(20.0));
        assert_eq!(last.value(), Some(20.0));
    }

    #[tokio::test]
    async fn test_publishes_when_connected() {
        let publisher = Arc::new(MockPublisher::connected());
        let mut job = TemperatureJob::new(Arc::new(MockSensor::constant(22.4)), publisher.clone());

        assert_eq!(job.run_once().await, JobOutcome::Published);
        assert_eq!(job.run_once().await, JobOutcome::Published);
        assert_eq!(publisher.values(), vec![22.4, 22.4]);
    }

    #[tokio::test]
    async fn test_skips_publish_when_disconnected() {
        let publisher = Arc::new(MockPublisher::disconnected());
        let sensor = Arc::new(MockSensor::constant(22.4));
        let mut job = TemperatureJob::new(sensor.clone(), publisher.clone());

        assert_eq!(job.run_once().await, JobOutcome::SkippedDisconnected);
        assert_eq!(sensor.read_count(), 1);
        assert_eq!(publisher.publish_calls(), 0);
        assert_eq!(job.last_known().value(), Some(22.4));
    }

    #[tokio::test]
    async fn test_publishing_follows_connectivity() {
        let publisher = Arc::new(MockPublisher::connected());
        let sensor = MockSensor::new(vec![Ok(20.0), Ok(21.0), Ok(22.0)]);
        let mut job = TemperatureJob::new(Arc::new(sensor), publisher.clone());

        assert_eq!(job.run_once().await, JobOutcome::Published);

        publisher.set_connected(false);
        assert_eq!(job.run_once().await, JobOutcome::SkippedDisconnected);

        publisher.set_connected(true);
        assert_eq!(job.run_once().await, JobOutcome::Published);

        // The reading taken while offline is not replayed
        assert_eq!(publisher.values(), vec![20.0, 22.0]);
        assert_eq!(job.last_known().value(), Some(22.0));
    }

    #[tokio::test]
    async fn test_sensor_failure_skips_cycle() {
        let publisher = Arc::new(MockPublisher::connected());
        let sensor = MockSensor::new(vec![Err("unplugged".to_string()), Ok(19.0)]);
        let mut job = TemperatureJob::new(Arc::new(sensor), publisher.clone());

        assert_eq!(job.run_once().await, JobOutcome::SensorFailed);
        assert_eq!(publisher.publish_calls(), 0);
        assert_eq!(job.last_known().value(), None);

        assert_eq!(job.run_once().await, JobOutcome::Published);
        assert_eq!(publisher.publish_calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_publish_is_reported() {
        let publisher = Arc::new(MockPublisher::connected());
        publisher.set_accept(false);
        let mut job = TemperatureJob::new(Arc::new(MockSensor::constant(18.0)), publisher.clone());

        assert_eq!(job.run_once().await, JobOutcome::PublishFailed);
        assert_eq!(publisher.publish_calls(), 1);
    }
}
