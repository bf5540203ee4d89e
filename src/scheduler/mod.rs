use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::VulnBridgeError;
use crate::models::Report;
use crate::pipeline::RunOrchestrator;

/// Anything the scheduler can trigger a run on.
#[async_trait]
pub trait RunDriver: Send + Sync {
    async fn run(&self, schedule_id: Option<&str>) -> Result<Report, VulnBridgeError>;
}

#[async_trait]
impl RunDriver for RunOrchestrator {
    async fn run(&self, schedule_id: Option<&str>) -> Result<Report, VulnBridgeError> {
        RunOrchestrator::run(self, schedule_id).await
    }
}

struct ScheduleHandle {
    cancel_token: CancellationToken,
    join: JoinHandle<()>,
}

/// Fires recurring runs at a fixed cadence. A tick that arrives while the
/// previous run of the same schedule is still in flight is skipped, never
/// queued: overlapping runs against the same targets are worse than a late
/// data point.
pub struct Scheduler {
    driver: Arc<dyn RunDriver>,
    schedules: DashMap<String, ScheduleHandle>,
    shutdown_token: CancellationToken,
}

impl Scheduler {
    pub fn new(driver: Arc<dyn RunDriver>) -> Self {
        Self {
            driver,
            schedules: DashMap::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Trigger a single unscheduled run and wait for its report.
    pub async fn run_once(&self) -> Result<Report, VulnBridgeError> {
        self.driver.run(None).await
    }

    /// Register a recurring schedule. The first run fires one cadence after
    /// registration.
    pub fn schedule_recurring(
        &self,
        schedule_id: &str,
        cadence: Duration,
    ) -> Result<(), VulnBridgeError> {
        if self.schedules.contains_key(schedule_id) {
            return Err(VulnBridgeError::Scheduler(format!(
                "Schedule '{}' is already registered",
                schedule_id
            )));
        }

        let cancel_token = self.shutdown_token.child_token();
        let token = cancel_token.clone();
        let driver = self.driver.clone();
        let id = schedule_id.to_string();
        let in_flight = Arc::new(AtomicBool::new(false));

        info!(schedule_id = %id, cadence_secs = cadence.as_secs(), "Schedule registered");
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval fires immediately; consume that so the first run
            // lands one full cadence after registration
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!(schedule_id = %id, "Schedule cancelled");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                if in_flight.swap(true, Ordering::SeqCst) {
                    warn!(schedule_id = %id, "Previous run still in flight, skipping this tick");
                    continue;
                }

                let driver = driver.clone();
                let in_flight = in_flight.clone();
                let schedule_id = id.clone();
                tokio::spawn(async move {
                    if let Err(e) = driver.run(Some(&schedule_id)).await {
                        warn!(schedule_id = %schedule_id, error = %e, "Scheduled run failed");
                    }
                    in_flight.store(false, Ordering::SeqCst);
                });
            }
        });

        self.schedules.insert(
            schedule_id.to_string(),
            ScheduleHandle { cancel_token, join },
        );
        Ok(())
    }

    /// Stop a schedule's future ticks. An already-started run finishes on
    /// its own. Returns false when no such schedule exists.
    pub fn cancel(&self, schedule_id: &str) -> bool {
        match self.schedules.remove(schedule_id) {
            Some((_, handle)) => {
                handle.cancel_token.cancel();
                handle.join.abort();
                true
            }
            None => false,
        }
    }

    pub fn active_schedules(&self) -> Vec<String> {
        self.schedules.iter().map(|e| e.key().clone()).collect()
    }

    /// Cancel every schedule and wait for the tick loops to exit.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        let ids: Vec<String> = self.active_schedules();
        for id in ids {
            if let Some((_, handle)) = self.schedules.remove(&id) {
                let _ = handle.join.await;
            }
        }
        info!("Scheduler shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeveritySummary;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;

    struct FakeDriver {
        runs: AtomicUsize,
        run_duration: Duration,
    }

    impl FakeDriver {
        fn instant() -> Self {
            Self {
                runs: AtomicUsize::new(0),
                run_duration: Duration::ZERO,
            }
        }

        fn slow(run_duration: Duration) -> Self {
            Self {
                runs: AtomicUsize::new(0),
                run_duration,
            }
        }
    }

    #[async_trait]
    impl RunDriver for FakeDriver {
        async fn run(&self, schedule_id: Option<&str>) -> Result<Report, VulnBridgeError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if !self.run_duration.is_zero() {
                tokio::time::sleep(self.run_duration).await;
            }
            Ok(Report {
                run_id: format!("run-for-{}", schedule_id.unwrap_or("adhoc")),
                started_at: Utc::now(),
                finished_at: Utc::now(),
                entries: vec![],
                summary: SeveritySummary::default(),
                warnings: vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_run_once_delegates_to_driver() {
        let driver = Arc::new(FakeDriver::instant());
        let scheduler = Scheduler::new(driver.clone());

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.run_id, "run-for-adhoc");
        assert_eq!(driver.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recurring_fires_at_cadence() {
        let driver = Arc::new(FakeDriver::instant());
        let scheduler = Scheduler::new(driver.clone());
        scheduler
            .schedule_recurring("nightly", Duration::from_secs(60))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(185)).await;
        assert_eq!(driver.runs.load(Ordering::SeqCst), 3);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_tick_is_skipped() {
        // Runs take 90s against a 60s cadence; every other tick overlaps.
        let driver = Arc::new(FakeDriver::slow(Duration::from_secs(90)));
        let scheduler = Scheduler::new(driver.clone());
        scheduler
            .schedule_recurring("hourly", Duration::from_secs(60))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(250)).await;
        // Ticks at 60, 120, 180, 240; the ones at 120 and 240 land mid-run.
        assert_eq!(driver.runs.load(Ordering::SeqCst), 2);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_future_ticks() {
        let driver = Arc::new(FakeDriver::instant());
        let scheduler = Scheduler::new(driver.clone());
        scheduler
            .schedule_recurring("weekly", Duration::from_secs(60))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(driver.runs.load(Ordering::SeqCst), 1);

        assert!(scheduler.cancel("weekly"));
        assert!(scheduler.active_schedules().is_empty());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(driver.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_schedule_rejected() {
        let scheduler = Scheduler::new(Arc::new(FakeDriver::instant()));
        scheduler
            .schedule_recurring("s1", Duration::from_secs(60))
            .unwrap();
        let result = scheduler.schedule_recurring("s1", Duration::from_secs(60));
        assert!(matches!(result, Err(VulnBridgeError::Scheduler(_))));
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_unknown_schedule_returns_false() {
        let scheduler = Scheduler::new(Arc::new(FakeDriver::instant()));
        assert!(!scheduler.cancel("ghost"));
    }
}
