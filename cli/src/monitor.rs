//! The poll-and-accumulate service object.
//!
//! One [`Monitor::poll`] is one driver tick: read the power source, fetch the
//! current reading and forecast, update the charging totals, derive advice.
//! The monitor is not internally synchronized; the driver serializes polls.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use leaf_carbon::accumulator::record_sample;
use leaf_carbon::{
    advise, Advice, Band, CacheError, Fetcher, FetchError, ImpactAccumulator, IntensityClient,
    Scope,
};
use leaf_platform::PowerSource;

/// Result of one poll, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactUpdate {
    pub session_grams: f64,
    pub lifetime_grams: f64,
    pub band: Band,
    /// `None` when the forecast was too short to advise on.
    pub advice: Option<Advice>,
    pub scope: Scope,
    pub intensity: i32,
    pub charging: bool,
    pub draw_watts: f64,
    pub polled_at: DateTime<Utc>,
}

pub trait ImpactObserver {
    fn on_impact_updated(&mut self, update: &ImpactUpdate);
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Failed to read power state: {0}")]
    Power(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to persist totals: {0}")]
    Persist(#[from] CacheError),
}

/// Gap since the last stored sample after which charging counts as a new
/// session.
pub const DEFAULT_SESSION_GAP: Duration = Duration::from_secs(10 * 60);

pub struct Monitor<P, F> {
    power: P,
    client: IntensityClient<F>,
    accumulator: ImpactAccumulator,
    scope: Scope,
    /// Power state seen by the previous successful poll. Seeded from the
    /// persisted totals on the first poll.
    was_charging: Option<bool>,
    session_gap: TimeDelta,
}

impl<P: PowerSource, F: Fetcher> Monitor<P, F> {
    pub fn new(
        power: P,
        client: IntensityClient<F>,
        accumulator: ImpactAccumulator,
        scope: Scope,
    ) -> Self {
        Self {
            power,
            client,
            accumulator,
            scope,
            was_charging: None,
            session_gap: gap_delta(DEFAULT_SESSION_GAP),
        }
    }

    pub fn with_session_gap(mut self, gap: Duration) -> Self {
        self.session_gap = gap_delta(gap);
        self
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn poll(&mut self) -> Result<ImpactUpdate, PollError> {
        self.poll_at(Utc::now())
    }

    pub fn poll_at(&mut self, now: DateTime<Utc>) -> Result<ImpactUpdate, PollError> {
        self.power
            .refresh()
            .map_err(|e| PollError::Power(format!("{:#}", e)))?;
        let charging = self.power.is_ac_powered();
        let draw_watts = f64::from(self.power.current_power_draw_watts());

        // Both fetches happen before the totals are touched, so a network
        // failure leaves them exactly as they were.
        let reading = self.client.current_at(self.scope, now)?;
        let forecast = self.client.forecast_at(self.scope, now)?;

        let totals = self.accumulator.load_or_init()?;
        let was_charging = self
            .was_charging
            .unwrap_or_else(|| totals.has_open_session());

        let totals = if charging {
            let last_sample = totals.samples.last().map(|s| s.taken_at);
            let totals = match last_sample {
                Some(last) if now - last > self.session_gap => {
                    let reset = self.accumulator.reset()?;
                    info!(
                        last_sample = %last,
                        lifetime_grams = reset.lifetime_grams,
                        "Charging resumed after a gap, starting a new session"
                    );
                    reset
                }
                _ => totals,
            };
            let updated = record_sample(&totals, draw_watts, reading.intensity(), now);
            self.accumulator.persist(&updated)?;
            debug!(
                samples = updated.samples.len(),
                session_grams = updated.session_grams,
                "Recorded charging sample"
            );
            updated
        } else if was_charging {
            let reset = self.accumulator.reset()?;
            info!(
                lifetime_grams = reset.lifetime_grams,
                "Charger disconnected, session reset"
            );
            reset
        } else {
            totals
        };
        self.was_charging = Some(charging);

        let advice = match advise(&forecast) {
            Ok(advice) => Some(advice),
            Err(e) => {
                warn!(error = %e, "No charging advice this tick");
                None
            }
        };

        Ok(ImpactUpdate {
            session_grams: totals.session_grams,
            lifetime_grams: totals.lifetime_grams,
            band: reading.band,
            advice,
            scope: self.scope,
            intensity: reading.intensity(),
            charging,
            draw_watts,
            polled_at: now,
        })
    }
}

fn gap_delta(gap: Duration) -> TimeDelta {
    TimeDelta::from_std(gap).unwrap_or(TimeDelta::MAX)
}
