//! Typed encode/decode layer over [`DiskStore`] plus the freshness rules for
//! cached upstream data.

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::store::DiskStore;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Default lifetime under [`FreshnessPolicy::FixedTtl`].
pub const DEFAULT_TTL_SECS: i64 = 1800;

/// Serializes records as JSON into a [`DiskStore`].
///
/// Decoding is strict: a blob with missing or mistyped fields is a
/// [`CacheError::Decode`], never a partially filled value.
#[derive(Debug, Clone)]
pub struct TypedCache {
    store: DiskStore,
}

impl TypedCache {
    pub fn new(store: DiskStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DiskStore {
        &self.store
    }

    pub fn fetch<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.store.get(key)?;
        serde_json::from_slice(&bytes).map_err(|source| CacheError::Decode {
            key: key.to_string(),
            source,
        })
    }

    pub fn save<T: Serialize>(&self, value: &T, key: &str) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.put(key, &bytes)?;
        Ok(())
    }
}

/// A cached payload together with the moment it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEnvelope<T> {
    pub payload: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CachedEnvelope<T> {
    pub fn new(payload: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            fetched_at,
        }
    }
}

/// Payloads that carry the provider's own validity window.
pub trait ValidityWindow {
    /// End of the window the payload describes. `None` means the payload has
    /// no usable window and is always considered expired.
    fn valid_to(&self) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Expired,
}

/// How a cached envelope is judged fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreshnessPolicy {
    /// Fresh while `now - fetched_at < ttl`.
    FixedTtl(TimeDelta),
    /// Fresh until `now` passes the payload's `valid_to`.
    #[default]
    ValidityWindow,
}

impl FreshnessPolicy {
    pub fn fixed_ttl_secs(secs: i64) -> Self {
        FreshnessPolicy::FixedTtl(TimeDelta::seconds(secs))
    }

    pub fn evaluate<T: ValidityWindow>(
        &self,
        envelope: &CachedEnvelope<T>,
        now: DateTime<Utc>,
    ) -> Freshness {
        let fresh = match self {
            FreshnessPolicy::FixedTtl(ttl) => now - envelope.fetched_at < *ttl,
            FreshnessPolicy::ValidityWindow => envelope
                .payload
                .valid_to()
                .is_some_and(|valid_to| now <= valid_to),
        };

        if fresh {
            Freshness::Fresh
        } else {
            Freshness::Expired
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Window {
        to: Option<DateTime<Utc>>,
    }

    impl ValidityWindow for Window {
        fn valid_to(&self) -> Option<DateTime<Utc>> {
            self.to
        }
    }

    fn cache() -> (tempfile::TempDir, TypedCache) {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        (dir, TypedCache::new(store))
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_save_then_fetch_round_trips() {
        let (_dir, cache) = cache();
        let envelope = CachedEnvelope::new(
            Window {
                to: Some(ts("2024-03-01T12:30:00Z")),
            },
            ts("2024-03-01T12:05:00Z"),
        );

        cache.save(&envelope, "api:national").unwrap();
        let back: CachedEnvelope<Window> = cache.fetch("api:national").unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_totals_and_forecast_round_trip_exactly() {
        use crate::accumulator::{SessionTotals, WattSample};
        use crate::reading::{Band, CarbonReading};

        let (_dir, cache) = cache();
        let totals = SessionTotals {
            session_grams: 0.0031719958715313865,
            lifetime_grams: 0.010467586376053576,
            samples: vec![
                WattSample {
                    watts: 0.1 + 0.2,
                    taken_at: ts("2024-03-01T12:00:00Z"),
                },
                WattSample {
                    watts: 61.5 / 7.0,
                    taken_at: ts("2024-03-01T12:02:00Z"),
                },
            ],
        };
        cache.save(&totals, "watts").unwrap();
        assert_eq!(cache.fetch::<SessionTotals>("watts").unwrap(), totals);

        // Accumulate the way polls do and reload after every step.
        let mut lifetime = 0.0_f64;
        for i in 1..2000u32 {
            lifetime += (f64::from(i) / 3.0).sqrt() / 997.0;
            let step = SessionTotals {
                lifetime_grams: lifetime,
                ..SessionTotals::default()
            };
            cache.save(&step, "watts").unwrap();
            let back: SessionTotals = cache.fetch("watts").unwrap();
            assert_eq!(back.lifetime_grams.to_bits(), lifetime.to_bits());
        }

        let forecast = vec![
            CarbonReading {
                valid_from: ts("2024-03-01T12:00:00Z"),
                valid_to: ts("2024-03-01T12:30:00Z"),
                forecast_index_value: 187,
                actual_index_value: 191,
                band: Band::Moderate,
            },
            CarbonReading {
                valid_from: ts("2024-03-01T12:30:00Z"),
                valid_to: ts("2024-03-01T13:00:00Z"),
                forecast_index_value: 240,
                actual_index_value: 240,
                band: Band::High,
            },
        ];
        let envelope = CachedEnvelope::new(forecast, ts("2024-03-01T12:05:00Z"));
        cache.save(&envelope, "api:national:forecast").unwrap();
        assert_eq!(
            cache
                .fetch::<CachedEnvelope<Vec<CarbonReading>>>("api:national:forecast")
                .unwrap(),
            envelope
        );
    }

    #[test]
    fn test_fetch_missing_is_miss() {
        let (_dir, cache) = cache();
        let err = cache.fetch::<Window>("watts").unwrap_err();
        assert!(matches!(err, CacheError::Storage(StorageError::NotFound(_))));
        assert!(err.is_miss());
    }

    #[test]
    fn test_fetch_wrong_shape_is_decode_error() {
        let (_dir, cache) = cache();
        cache.store().put("watts", b"{\"unrelated\": true}").unwrap();

        let err = cache.fetch::<CachedEnvelope<Window>>("watts").unwrap_err();
        assert!(matches!(err, CacheError::Decode { .. }));
        assert!(err.is_miss());
    }

    #[test]
    fn test_fetch_garbage_is_decode_error() {
        let (_dir, cache) = cache();
        cache.store().put("watts", b"\x00\xffnot json").unwrap();
        assert!(matches!(
            cache.fetch::<Window>("watts"),
            Err(CacheError::Decode { .. })
        ));
    }

    #[test]
    fn test_fixed_ttl_boundaries() {
        let policy = FreshnessPolicy::fixed_ttl_secs(DEFAULT_TTL_SECS);
        let now = ts("2024-03-01T12:00:00Z");
        let envelope = |age: i64| CachedEnvelope::new(Window { to: None }, now - TimeDelta::seconds(age));

        assert_eq!(policy.evaluate(&envelope(1799), now), Freshness::Fresh);
        assert_eq!(policy.evaluate(&envelope(1801), now), Freshness::Expired);
    }

    #[test]
    fn test_validity_window_policy() {
        let policy = FreshnessPolicy::ValidityWindow;
        let fetched = ts("2024-03-01T11:00:00Z");
        let envelope = CachedEnvelope::new(
            Window {
                to: Some(ts("2024-03-01T12:00:00Z")),
            },
            fetched,
        );

        assert_eq!(
            policy.evaluate(&envelope, ts("2024-03-01T11:59:59Z")),
            Freshness::Fresh
        );
        assert_eq!(
            policy.evaluate(&envelope, ts("2024-03-01T12:00:01Z")),
            Freshness::Expired
        );
    }

    #[test]
    fn test_validity_window_without_window_is_expired() {
        let envelope = CachedEnvelope::new(Window { to: None }, ts("2024-03-01T11:00:00Z"));
        assert_eq!(
            FreshnessPolicy::ValidityWindow.evaluate(&envelope, ts("2024-03-01T11:00:00Z")),
            Freshness::Expired
        );
    }
}
