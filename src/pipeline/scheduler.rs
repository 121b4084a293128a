//! Repeating cycle driver.
//!
//! One cycle may be in flight at a time: the driver is a single task that
//! awaits each cycle to completion, and missed interval ticks are dropped,
//! not queued. Stopping is cooperative; the running cycle finishes its
//! in-flight collaborator call before observing the flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::models::CycleReport;

/// Cloneable cooperative stop flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Raw flag for loops that poll between collaborator calls.
    pub fn flag(&self) -> &Arc<AtomicBool> {
        &self.0
    }
}

/// Something that can run one discovery/enrichment cycle.
#[async_trait]
pub trait CycleSource {
    async fn run_cycle(&mut self) -> Result<CycleReport>;
}

/// Fixed-interval scheduler with a single in-flight cycle.
pub struct Scheduler {
    interval: Duration,
    stop: StopSignal,
}

impl Scheduler {
    pub fn new(interval: Duration, stop: StopSignal) -> Self {
        Self { interval, stop }
    }

    /// Run cycles until the stop signal triggers.
    ///
    /// The first cycle starts immediately. A cycle error is logged and the
    /// loop proceeds to the next tick; it never terminates the scheduler.
    pub async fn run(&self, source: &mut dyn CycleSource) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.stop.is_triggered() {
                log::info!("Stop signal received, scheduler shutting down");
                break;
            }

            let started = std::time::Instant::now();
            match source.run_cycle().await {
                Ok(report) => log::info!(
                    "Cycle done [{}]: {} queries, {} mentions, {} enriched, {} reused",
                    report.strategy,
                    report.queries_issued,
                    report.mentions_found,
                    report.records_enriched,
                    report.records_reused
                ),
                Err(error) => log::error!("Cycle failed: {error}"),
            }

            let elapsed = started.elapsed();
            if elapsed > self.interval {
                log::warn!(
                    "Cycle ran {}s, longer than the {}s interval; missed triggers dropped",
                    elapsed.as_secs(),
                    self.interval.as_secs()
                );
            }
            if self.stop.is_triggered() {
                log::info!("Stop signal received, scheduler shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    struct CountingSource {
        runs: usize,
        fail_on: Option<usize>,
        stop_after: usize,
        stop: StopSignal,
    }

    #[async_trait]
    impl CycleSource for CountingSource {
        async fn run_cycle(&mut self) -> Result<CycleReport> {
            self.runs += 1;
            if self.runs >= self.stop_after {
                self.stop.trigger();
            }
            if self.fail_on == Some(self.runs) {
                return Err(AppError::checkpoint("disk full"));
            }
            Ok(CycleReport::default())
        }
    }

    #[tokio::test]
    async fn test_runs_until_stopped() {
        let stop = StopSignal::new();
        let mut source = CountingSource {
            runs: 0,
            fail_on: None,
            stop_after: 3,
            stop: stop.clone(),
        };

        let scheduler = Scheduler::new(Duration::from_millis(5), stop);
        scheduler.run(&mut source).await;
        assert_eq!(source.runs, 3);
    }

    #[tokio::test]
    async fn test_cycle_error_does_not_kill_scheduler() {
        let stop = StopSignal::new();
        let mut source = CountingSource {
            runs: 0,
            fail_on: Some(1),
            stop_after: 2,
            stop: stop.clone(),
        };

        let scheduler = Scheduler::new(Duration::from_millis(5), stop);
        scheduler.run(&mut source).await;
        // The failing first cycle is survived
        assert_eq!(source.runs, 2);
    }

    #[tokio::test]
    async fn test_pre_triggered_stop_runs_nothing() {
        let stop = StopSignal::new();
        stop.trigger();
        let mut source = CountingSource {
            runs: 0,
            fail_on: None,
            stop_after: 100,
            stop: stop.clone(),
        };

        let scheduler = Scheduler::new(Duration::from_millis(5), stop);
        scheduler.run(&mut source).await;
        assert_eq!(source.runs, 0);
    }
}
