//! Single-worker tick driver around a [`Monitor`].
//!
//! Ticks come from a fixed interval and from SIGUSR1. Each tick try-locks the
//! monitor: if the previous poll still holds it the tick is dropped, so two
//! polls never interleave their read-modify-write of the totals.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use leaf_carbon::Fetcher;
use leaf_platform::PowerSource;

use crate::monitor::{ImpactObserver, Monitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    Failed,
    /// A previous poll was still running.
    Skipped,
    /// The poll outlived the tick budget. It keeps running and holds the
    /// monitor until it finishes.
    TimedOut,
}

pub struct Driver<P, F> {
    monitor: Arc<Mutex<Monitor<P, F>>>,
    tick_budget: Duration,
}

impl<P, F> Driver<P, F>
where
    P: PowerSource + Send + 'static,
    F: Fetcher + Send + 'static,
{
    pub fn new(monitor: Monitor<P, F>, tick_budget: Duration) -> Self {
        Self {
            monitor: Arc::new(Mutex::new(monitor)),
            tick_budget,
        }
    }

    pub async fn tick<O: ImpactObserver>(&self, observer: &mut O) -> TickOutcome {
        let Ok(mut monitor) = Arc::clone(&self.monitor).try_lock_owned() else {
            warn!("Previous poll still running, dropping this tick");
            return TickOutcome::Skipped;
        };

        let task = tokio::task::spawn_blocking(move || monitor.poll());

        match tokio::time::timeout(self.tick_budget, task).await {
            Ok(Ok(Ok(update))) => {
                debug!(
                    session_grams = update.session_grams,
                    lifetime_grams = update.lifetime_grams,
                    band = %update.band,
                    "Poll complete"
                );
                observer.on_impact_updated(&update);
                TickOutcome::Completed
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Poll failed, retrying next tick");
                TickOutcome::Failed
            }
            Ok(Err(e)) => {
                error!(error = %e, "Poll task did not complete");
                TickOutcome::Failed
            }
            Err(_) => {
                warn!(
                    budget_secs = self.tick_budget.as_secs_f64(),
                    "Poll exceeded tick budget"
                );
                TickOutcome::TimedOut
            }
        }
    }

    /// Tick on `interval` (first tick immediately) and on SIGUSR1 until
    /// `shutdown` resolves.
    pub async fn run<O, S>(&self, interval: Duration, observer: &mut O, shutdown: S) -> Result<()>
    where
        O: ImpactObserver,
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut manual = signal(SignalKind::user_defined1())?;
        tokio::pin!(shutdown);

        info!(
            interval_secs = interval.as_secs(),
            budget_secs = self.tick_budget.as_secs(),
            "Poll driver started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(observer).await;
                }
                Some(()) = manual.recv() => {
                    info!("Manual poll requested");
                    self.tick(observer).await;
                }
                _ = &mut shutdown => {
                    info!("Poll driver stopping");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::monitor::testing::*;
    use crate::monitor::ImpactUpdate;

    #[derive(Default)]
    struct Recorder {
        updates: Vec<ImpactUpdate>,
    }

    impl ImpactObserver for Recorder {
        fn on_impact_updated(&mut self, update: &ImpactUpdate) {
            self.updates.push(update.clone());
        }
    }

    fn fetcher() -> FakeFetcher {
        let now = Utc::now();
        // Windows that stay valid for the whole test.
        let current = format!(
            r#"{{"data":[{{"from":"{}","to":"{}","intensity":{{"forecast":120,"actual":null,"index":"low"}}}}]}}"#,
            now.format("%Y-%m-%dT%H:%MZ"),
            (now + chrono::TimeDelta::hours(1)).format("%Y-%m-%dT%H:%MZ"),
        );
        FakeFetcher::new(current, forecast_body(&["low", "low", "low"]))
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let power = FakePower::scripted(vec![on_ac(50.0)]).with_delay(Duration::from_millis(400));
        let driver = Driver::new(
            monitor(dir.path(), power, fetcher()),
            Duration::from_millis(50),
        );
        let mut recorder = Recorder::default();

        assert_eq!(driver.tick(&mut recorder).await, TickOutcome::TimedOut);
        assert_eq!(driver.tick(&mut recorder).await, TickOutcome::Skipped);
        assert!(recorder.updates.is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;
        let driver = Driver {
            monitor: Arc::clone(&driver.monitor),
            tick_budget: Duration::from_secs(5),
        };
        assert_eq!(driver.tick(&mut recorder).await, TickOutcome::Completed);
        assert_eq!(recorder.updates.len(), 1);
        assert_eq!(recorder.updates[0].intensity, 120);
    }

    #[tokio::test]
    async fn test_failed_poll_is_reported_and_next_tick_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher();
        fetcher.set_offline(true);
        let driver = Driver::new(
            monitor(dir.path(), FakePower::scripted(vec![on_battery()]), fetcher.clone()),
            Duration::from_secs(5),
        );
        let mut recorder = Recorder::default();

        assert_eq!(driver.tick(&mut recorder).await, TickOutcome::Failed);
        assert!(recorder.updates.is_empty());

        fetcher.set_offline(false);
        assert_eq!(driver.tick(&mut recorder).await, TickOutcome::Completed);
        assert_eq!(recorder.updates.len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Driver::new(
            monitor(dir.path(), FakePower::scripted(vec![on_battery()]), fetcher()),
            Duration::from_secs(5),
        );
        let mut recorder = Recorder::default();

        driver
            .run(
                Duration::from_secs(3600),
                &mut recorder,
                tokio::time::sleep(Duration::from_millis(300)),
            )
            .await
            .unwrap();

        assert_eq!(recorder.updates.len(), 1);
    }
}
