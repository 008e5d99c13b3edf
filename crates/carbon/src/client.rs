//! Fetch-or-cache orchestration for carbon-intensity data.
//!
//! For each scope and data kind the client tries the cache first, judges the
//! cached envelope with its [`FreshnessPolicy`], and only on a miss, an
//! expired entry or an undecodable entry issues a single GET. Successful
//! responses are normalized, written back to the cache and returned. There are
//! no retries here: the poll driver simply tries again on its next tick.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{self, DataKind, Endpoints, DEFAULT_FORECAST_WINDOW_MINS};
use crate::cache::{CachedEnvelope, Freshness, FreshnessPolicy, TypedCache, ValidityWindow};
use crate::error::FetchError;
use crate::reading::CarbonReading;
use crate::region::Scope;

pub type Result<T> = std::result::Result<T, FetchError>;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw HTTP outcome: status code and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Transport seam. Implementations perform exactly one GET per call and map
/// transport failures to [`FetchError::NetworkUnavailable`].
pub trait Fetcher {
    fn get(&self, url: &str) -> Result<RawResponse>;
}

/// Blocking HTTP fetcher backed by a `ureq` agent with a global timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<RawResponse> {
        let network_error = |e: ureq::Error| FetchError::NetworkUnavailable {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let mut response = self
            .agent
            .get(url)
            .header("Accept", "application/json")
            .header("User-Agent", concat!("leaf/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_vec().map_err(network_error)?;

        Ok(RawResponse { status, body })
    }
}

pub struct IntensityClient<F> {
    fetcher: F,
    cache: TypedCache,
    endpoints: Endpoints,
    policy: FreshnessPolicy,
    forecast_window_mins: i64,
}

impl<F: Fetcher> IntensityClient<F> {
    pub fn new(fetcher: F, cache: TypedCache) -> Self {
        Self {
            fetcher,
            cache,
            endpoints: Endpoints::default(),
            policy: FreshnessPolicy::default(),
            forecast_window_mins: DEFAULT_FORECAST_WINDOW_MINS,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_policy(mut self, policy: FreshnessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_forecast_window(mut self, minutes: i64) -> Self {
        self.forecast_window_mins = minutes;
        self
    }

    /// Current-interval reading for `scope`.
    pub fn current(&self, scope: Scope) -> Result<CarbonReading> {
        self.current_at(scope, Utc::now())
    }

    pub fn current_at(&self, scope: Scope, now: DateTime<Utc>) -> Result<CarbonReading> {
        let key = api::cache_key(scope, DataKind::Current);
        if let Some(reading) = self.cached::<CarbonReading>(&key, now) {
            return Ok(reading);
        }

        let url = self.endpoints.current(scope);
        let body = self.fetch_body(&url)?;
        let reading = api::parse_current(scope, &body, now).map_err(|e| {
            FetchError::InvalidResponse {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        info!(
            scope = %scope.label(),
            intensity = reading.actual_index_value,
            band = %reading.band,
            "Fetched carbon intensity"
        );
        self.store(&key, &reading, now);
        Ok(reading)
    }

    /// Forecast intervals covering the configured window from now.
    pub fn forecast(&self, scope: Scope) -> Result<Vec<CarbonReading>> {
        self.forecast_at(scope, Utc::now())
    }

    pub fn forecast_at(&self, scope: Scope, now: DateTime<Utc>) -> Result<Vec<CarbonReading>> {
        let key = api::cache_key(scope, DataKind::Forecast);
        if let Some(forecast) = self.cached::<Vec<CarbonReading>>(&key, now) {
            return Ok(forecast);
        }

        let (from, to) = api::forecast_window(now, self.forecast_window_mins);
        let url = self.endpoints.forecast(scope, from, to);
        let body = self.fetch_body(&url)?;
        let forecast = api::parse_forecast(scope, &body, now).map_err(|e| {
            FetchError::InvalidResponse {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        info!(
            scope = %scope.label(),
            intervals = forecast.len(),
            "Fetched carbon intensity forecast"
        );
        self.store(&key, &forecast, now);
        Ok(forecast)
    }

    fn cached<T>(&self, key: &str, now: DateTime<Utc>) -> Option<T>
    where
        T: DeserializeOwned + ValidityWindow,
    {
        match self.cache.fetch::<CachedEnvelope<T>>(key) {
            Ok(envelope) => match self.policy.evaluate(&envelope, now) {
                Freshness::Fresh => {
                    debug!(key, fetched_at = %envelope.fetched_at, "Cache hit");
                    Some(envelope.payload)
                }
                Freshness::Expired => {
                    debug!(key, fetched_at = %envelope.fetched_at, "Cache entry expired");
                    None
                }
            },
            Err(e) if e.is_miss() => {
                debug!(key, reason = %e, "Cache miss");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, refetching");
                None
            }
        }
    }

    fn fetch_body(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "Requesting carbon intensity");
        let response = self.fetcher.get(url)?;

        if response.status != 200 {
            let message = api::parse_api_error(&response.body).map(|e| e.describe());
            return Err(FetchError::UpstreamNonSuccess {
                url: url.to_string(),
                status: response.status,
                message,
            });
        }

        Ok(response.body)
    }

    fn store<T: Serialize>(&self, key: &str, payload: &T, now: DateTime<Utc>) {
        let envelope = CachedEnvelope::new(payload, now);
        if let Err(e) = self.cache.save(&envelope, key) {
            warn!(key, error = %e, "Failed to cache intensity data");
        }
    }
}
