//! Session and lifetime charging-impact accounting.
//!
//! The running totals live in the cache under [`TOTALS_KEY`]. They are the
//! only mutable record the accumulator owns: created on first charge, updated
//! on every poll while on AC power, and zeroed (never deleted) when AC power
//! is lost. `lifetime_grams` is the sum of every session delta and survives
//! resets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::TypedCache;
use crate::error::CacheError;

pub const TOTALS_KEY: &str = "watts";

const SECS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WattSample {
    pub watts: f64,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionTotals {
    pub session_grams: f64,
    pub lifetime_grams: f64,
    pub samples: Vec<WattSample>,
}

impl SessionTotals {
    /// A non-empty sample list means a charging session is in progress.
    pub fn has_open_session(&self) -> bool {
        !self.samples.is_empty()
    }
}

/// Mean draw over the samples, 0 when there are none or they sum to 0.
pub fn average_watts(samples: &[WattSample]) -> f64 {
    let sum: f64 = samples.iter().map(|s| s.watts).sum();
    if samples.is_empty() || sum == 0.0 {
        return 0.0;
    }
    sum / samples.len() as f64
}

/// Hours between the first and last sample, 0 with fewer than two samples.
pub fn hours_charging(samples: &[WattSample]) -> f64 {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) if samples.len() >= 2 => {
            (last.taken_at - first.taken_at).num_milliseconds() as f64 / 1000.0 / SECS_PER_HOUR
        }
        _ => 0.0,
    }
}

/// Session impact: `(hours_charging / carbon_intensity) * average_watts`.
///
/// The units of this expression do not reduce to grams of CO2. It is kept
/// as-is so totals stay comparable with previously recorded figures.
pub fn session_impact(samples: &[WattSample], carbon_intensity: i32) -> f64 {
    let hours = hours_charging(samples);
    if hours == 0.0 || carbon_intensity <= 0 {
        return 0.0;
    }
    (hours / carbon_intensity as f64) * average_watts(samples)
}

/// Append a sample and recompute the totals. Pure: nothing is persisted.
///
/// `lifetime_grams` moves by exactly the change in `session_grams`, so a reset
/// followed by fresh samples keeps accruing on top of the preserved lifetime.
pub fn record_sample(
    current: &SessionTotals,
    watts: f64,
    carbon_intensity: i32,
    taken_at: DateTime<Utc>,
) -> SessionTotals {
    let watts = if watts.is_finite() && watts > 0.0 {
        watts
    } else {
        0.0
    };

    let mut samples = current.samples.clone();
    samples.push(WattSample { watts, taken_at });

    let session_grams = session_impact(&samples, carbon_intensity);
    let lifetime_grams = current.lifetime_grams + (session_grams - current.session_grams);

    SessionTotals {
        session_grams,
        lifetime_grams,
        samples,
    }
}

/// Owns the persisted [`SessionTotals`] record.
#[derive(Debug, Clone)]
pub struct ImpactAccumulator {
    cache: TypedCache,
}

impl ImpactAccumulator {
    pub fn new(cache: TypedCache) -> Self {
        Self { cache }
    }

    /// Load the totals, or create and persist zeroed ones when the record is
    /// missing or no longer decodes. Any other read failure is returned and
    /// the stored record is left alone.
    pub fn load_or_init(&self) -> Result<SessionTotals, CacheError> {
        match self.cache.fetch::<SessionTotals>(TOTALS_KEY) {
            Ok(totals) => Ok(totals),
            Err(e) if e.is_miss() => {
                debug!(reason = %e, "No usable totals, starting from zero");
                let totals = SessionTotals::default();
                if let Err(e) = self.persist(&totals) {
                    warn!(error = %e, "Failed to persist zeroed totals");
                }
                Ok(totals)
            }
            Err(e) => Err(e),
        }
    }

    /// End the current session: zero the session figure and drop its samples,
    /// keeping the lifetime total.
    pub fn reset(&self) -> Result<SessionTotals, CacheError> {
        let mut totals = self.load_or_init()?;
        totals.session_grams = 0.0;
        totals.samples.clear();
        self.persist(&totals)?;
        debug!(lifetime_grams = totals.lifetime_grams, "Session reset");
        Ok(totals)
    }

    /// [`record_sample`] stamped with the current time.
    pub fn record_sample(
        &self,
        current: &SessionTotals,
        watts: f64,
        carbon_intensity: i32,
    ) -> SessionTotals {
        record_sample(current, watts, carbon_intensity, Utc::now())
    }

    pub fn persist(&self, totals: &SessionTotals) -> Result<(), CacheError> {
        self.cache.save(totals, TOTALS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::TimeDelta;

    use super::*;
    use crate::store::DiskStore;

    fn t0() -> DateTime<Utc> {
        "2024-03-01T12:00:00Z".parse().unwrap()
    }

    fn accumulator() -> (tempfile::TempDir, ImpactAccumulator) {
        let dir = tempfile::tempdir().unwrap();
        let cache = TypedCache::new(DiskStore::open(dir.path()).unwrap());
        (dir, ImpactAccumulator::new(cache))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_impact_formula_worked_example() {
        let samples = [
            WattSample {
                watts: 100.0,
                taken_at: t0(),
            },
            WattSample {
                watts: 200.0,
                taken_at: t0() + TimeDelta::seconds(3600),
            },
        ];

        assert!(approx(average_watts(&samples), 150.0));
        assert!(approx(hours_charging(&samples), 1.0));
        assert!(approx(session_impact(&samples, 150), 1.0));
    }

    #[test]
    fn test_impact_is_zero_without_duration_or_intensity() {
        let one = [WattSample {
            watts: 60.0,
            taken_at: t0(),
        }];
        assert_eq!(session_impact(&one, 200), 0.0);
        assert_eq!(session_impact(&[], 200), 0.0);

        let two = [
            one[0],
            WattSample {
                watts: 60.0,
                taken_at: t0() + TimeDelta::seconds(1800),
            },
        ];
        assert_eq!(session_impact(&two, 0), 0.0);
    }

    #[test]
    fn test_average_watts_zero_sum() {
        let samples = [
            WattSample {
                watts: 0.0,
                taken_at: t0(),
            },
            WattSample {
                watts: 0.0,
                taken_at: t0() + TimeDelta::seconds(60),
            },
        ];
        assert_eq!(average_watts(&samples), 0.0);
    }

    #[test]
    fn test_record_sample_tracks_lifetime_by_session_delta() {
        let start = SessionTotals {
            session_grams: 0.0,
            lifetime_grams: 5.0,
            samples: Vec::new(),
        };

        let a = record_sample(&start, 100.0, 150, t0());
        assert_eq!(a.samples.len(), 1);
        assert_eq!(a.session_grams, 0.0);
        assert!(approx(a.lifetime_grams, 5.0));

        let b = record_sample(&a, 200.0, 150, t0() + TimeDelta::seconds(3600));
        assert!(approx(b.session_grams, 1.0));
        assert!(approx(b.lifetime_grams, 6.0));
        assert_eq!(start.samples.len(), 0);
    }

    #[test]
    fn test_negative_or_nan_watts_recorded_as_zero() {
        let totals = record_sample(&SessionTotals::default(), -3.0, 100, t0());
        let totals = record_sample(&totals, f64::NAN, 100, t0() + TimeDelta::seconds(60));
        assert!(totals.samples.iter().all(|s| s.watts == 0.0));
    }

    #[test]
    fn test_reset_preserves_lifetime_accrual() {
        let (_dir, acc) = accumulator();
        let seeded = SessionTotals {
            session_grams: 0.0,
            lifetime_grams: 3.0,
            samples: Vec::new(),
        };
        acc.persist(&seeded).unwrap();

        let without_reset = {
            let a = record_sample(&seeded, 100.0, 150, t0());
            record_sample(&a, 200.0, 150, t0() + TimeDelta::seconds(3600))
        };

        let reset = acc.reset().unwrap();
        let with_reset = {
            let a = record_sample(&reset, 100.0, 150, t0());
            record_sample(&a, 200.0, 150, t0() + TimeDelta::seconds(3600))
        };

        assert!(approx(
            with_reset.lifetime_grams - reset.lifetime_grams,
            without_reset.lifetime_grams - seeded.lifetime_grams
        ));
    }

    #[test]
    fn test_reset_zeroes_session_only() {
        let (_dir, acc) = accumulator();
        let totals = record_sample(&SessionTotals::default(), 50.0, 100, t0());
        let totals = record_sample(&totals, 50.0, 100, t0() + TimeDelta::seconds(7200));
        acc.persist(&totals).unwrap();

        let reset = acc.reset().unwrap();
        assert_eq!(reset.session_grams, 0.0);
        assert!(reset.samples.is_empty());
        assert!(approx(reset.lifetime_grams, totals.lifetime_grams));
        assert_eq!(acc.load_or_init().unwrap(), reset);
    }

    #[test]
    fn test_malformed_totals_self_heal() {
        let (_dir, acc) = accumulator();
        acc.cache.store().put(TOTALS_KEY, b"{not valid json").unwrap();

        let totals = acc.load_or_init().unwrap();
        assert_eq!(totals, SessionTotals::default());

        let reread: SessionTotals = acc.cache.fetch(TOTALS_KEY).unwrap();
        assert_eq!(reread, SessionTotals::default());
    }

    #[test]
    fn test_unreadable_totals_are_not_overwritten() {
        let (_dir, acc) = accumulator();
        let path = acc.cache.store().path_for(TOTALS_KEY).unwrap();
        fs::create_dir_all(path.join("keep")).unwrap();

        let err = acc.load_or_init().unwrap_err();
        assert!(!err.is_miss());
        assert!(acc.reset().is_err());
        assert!(path.join("keep").is_dir());
    }

    #[test]
    fn test_missing_totals_created_and_persisted() {
        let (_dir, acc) = accumulator();
        assert_eq!(acc.load_or_init().unwrap(), SessionTotals::default());
        assert!(acc.cache.fetch::<SessionTotals>(TOTALS_KEY).is_ok());
    }
}
