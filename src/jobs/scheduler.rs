//! Fixed-interval job runner
//!
//! Runs one job on a tokio interval: first run immediately, later runs on
//! each tick. Ticks missed while a run is still in flight are skipped, so
//! runs never overlap. Shutdown waits for an in-flight run to complete.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Schedule interval must be greater than zero")]
    ZeroInterval,
    #[error("Job '{name}' runner terminated abnormally: {reason}")]
    RunnerFailed { name: String, reason: String },
}

/// Unit of periodic work
#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &str;

    async fn execute(&mut self);
}

/// Handle to a running schedule
pub struct ScheduleHandle {
    name: String,
    cancel: CancellationToken,
    runner: JoinHandle<u64>,
}

impl ScheduleHandle {
    /// Stop scheduling, wait for an in-flight run, return the run count
    pub async fn shutdown(self) -> Result<u64, SchedulerError> {
        info!(job = %self.name, "Stopping scheduled job");
        self.cancel.cancel();
        self.runner
            .await
            .map_err(|e| SchedulerError::RunnerFailed {
                name: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

/// Start running `job` every `interval` until `cancel` fires or the handle
/// is shut down.
pub fn schedule<J: Job + 'static>(
    mut job: J,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<ScheduleHandle, SchedulerError> {
    if interval.is_zero() {
        return Err(SchedulerError::ZeroInterval);
    }

    let name = job.name().to_string();
    let cancel = cancel.child_token();
    let token = cancel.clone();

    info!(job = %name, interval_secs = interval.as_secs(), "Scheduling job");

    let runner = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut runs = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            // A started run is allowed to finish
            job.execute().await;
            runs += 1;
            debug!(job = %job.name(), runs, "Job run complete");
        }
        runs
    });

    Ok(ScheduleHandle {
        name,
        cancel,
        runner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct CountingJob {
        runs: Arc<AtomicU64>,
        work: Duration,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }

        async fn execute(&mut self) {
            tokio::time::sleep(self.work).await;
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        let runs = Arc::new(AtomicU64::new(0));
        let job = CountingJob {
            runs,
            work: Duration::ZERO,
        };
        assert!(matches!(
            schedule(job, Duration::ZERO, &CancellationToken::new()),
            Err(SchedulerError::ZeroInterval)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_interval() {
        let runs = Arc::new(AtomicU64::new(0));
        let job = CountingJob {
            runs: runs.clone(),
            work: Duration::ZERO,
        };
        let handle = schedule(job, Duration::from_secs(30), &CancellationToken::new()).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        assert_eq!(handle.shutdown().await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_in_flight_run() {
        let runs = Arc::new(AtomicU64::new(0));
        let job = CountingJob {
            runs: runs.clone(),
            work: Duration::from_secs(10),
        };
        let handle = schedule(job, Duration::from_secs(30), &CancellationToken::new()).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        assert_eq!(handle.shutdown().await.unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_stops_runner() {
        let runs = Arc::new(AtomicU64::new(0));
        let job = CountingJob {
            runs: runs.clone(),
            work: Duration::ZERO,
        };
        let parent = CancellationToken::new();
        let handle = schedule(job, Duration::from_secs(5), &parent).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        parent.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(handle.shutdown().await.unwrap(), 1);
    }
}
