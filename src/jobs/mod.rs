//! Periodic work: the temperature job and the runner that drives it.

pub mod scheduler;
pub mod temperature;

pub use scheduler::{schedule, Job, ScheduleHandle, SchedulerError};
pub use temperature::{JobOutcome, LastKnownTemperature, TemperatureJob, SIGNIFICANT_CHANGE_CELSIUS};
