//! Upstream carbon-intensity API: URLs, cache keys, wire shapes and the
//! normalization that turns provider JSON into [`CarbonReading`]s.
//!
//! National responses look like `{ "data": [ { from, to, intensity } ] }`.
//! Regional responses add one level, `{ "data": [ { regionid, ..., "data": [...] } ] }`,
//! and the regional forecast endpoint returns that region object without the
//! surrounding array, so both shapes are accepted.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::reading::{Band, CarbonReading};
use crate::region::Scope;

pub const DEFAULT_BASE_URL: &str = "https://api.carbonintensity.org.uk";
pub const DEFAULT_FORECAST_WINDOW_MINS: i64 = 90;

/// Path-segment timestamp format, minute precision.
const PATH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Current,
    Forecast,
}

/// Cache key for a scope and data kind.
pub fn cache_key(scope: Scope, kind: DataKind) -> String {
    match (scope, kind) {
        (Scope::National, DataKind::Current) => "api:national".to_string(),
        (Scope::National, DataKind::Forecast) => "api:national:forecast".to_string(),
        (Scope::Regional(id), DataKind::Current) => format!("api:region:{}", id),
        (Scope::Regional(id), DataKind::Forecast) => format!("api:region:{}:forecast", id),
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Endpoints {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { base }
    }

    pub fn current(&self, scope: Scope) -> String {
        match scope {
            Scope::National => format!("{}/intensity", self.base),
            Scope::Regional(id) => format!("{}/regional/regionid/{}", self.base, id),
        }
    }

    pub fn forecast(&self, scope: Scope, from: DateTime<Utc>, to: DateTime<Utc>) -> String {
        let from = from.format(PATH_TIME_FORMAT);
        let to = to.format(PATH_TIME_FORMAT);
        match scope {
            Scope::National => format!("{}/intensity/{}/{}", self.base, from, to),
            Scope::Regional(id) => format!(
                "{}/regional/intensity/{}/{}/regionid/{}",
                self.base, from, to, id
            ),
        }
    }
}

/// The forecast window `[now, now + window]`.
pub fn forecast_window(now: DateTime<Utc>, window_mins: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + TimeDelta::minutes(window_mins))
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response contained no intensity data")]
    Empty,

    #[error("unparseable timestamp '{0}'")]
    Timestamp(String),
}

#[derive(Debug, Deserialize)]
struct WireIntensity {
    forecast: Option<i32>,
    actual: Option<i32>,
    index: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireInterval {
    from: Option<String>,
    to: Option<String>,
    intensity: Option<WireIntensity>,
}

#[derive(Debug, Deserialize)]
struct NationalResponse {
    data: Vec<WireInterval>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct WireRegion {
    regionid: Option<u8>,
    dnoregion: Option<String>,
    shortname: Option<String>,
    #[serde(default)]
    data: Vec<WireInterval>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegionalResponse {
    data: OneOrMany<WireRegion>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

/// Error envelope the API sends with non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ApiError {
    pub fn describe(&self) -> String {
        match (&self.message, &self.code) {
            (Some(message), Some(code)) => format!("{} ({})", message, code),
            (Some(message), None) => message.clone(),
            (None, Some(code)) => code.clone(),
            (None, None) => "unspecified API error".to_string(),
        }
    }
}

pub fn parse_api_error(body: &[u8]) -> Option<ApiError> {
    serde_json::from_slice::<ErrorResponse>(body)
        .ok()
        .map(|e| e.error)
}

/// Parse a "current intensity" body into the reading for the current interval.
pub fn parse_current(
    scope: Scope,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<CarbonReading, PayloadError> {
    parse_intervals(scope, body, now)?
        .into_iter()
        .next()
        .ok_or(PayloadError::Empty)
}

/// Parse a forecast-window body into its sequence of intervals.
pub fn parse_forecast(
    scope: Scope,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<Vec<CarbonReading>, PayloadError> {
    let readings = parse_intervals(scope, body, now)?;
    if readings.is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(readings)
}

fn parse_intervals(
    scope: Scope,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<Vec<CarbonReading>, PayloadError> {
    let intervals = match scope {
        Scope::National => serde_json::from_slice::<NationalResponse>(body)?.data,
        Scope::Regional(_) => serde_json::from_slice::<RegionalResponse>(body)?
            .data
            .into_vec()
            .into_iter()
            .flat_map(|region| region.data)
            .collect(),
    };

    intervals
        .into_iter()
        .map(|interval| normalize(interval, now))
        .collect()
}

/// Replace every provider null: missing bounds become `now`, a missing
/// `actual` becomes `forecast`, a missing `index` becomes unknown.
fn normalize(interval: WireInterval, now: DateTime<Utc>) -> Result<CarbonReading, PayloadError> {
    let valid_from = parse_bound(interval.from.as_deref(), now)?;
    let valid_to = parse_bound(interval.to.as_deref(), now)?;

    let (forecast, actual, index) = match interval.intensity {
        Some(i) => (i.forecast, i.actual, i.index),
        None => (None, None, None),
    };
    let forecast_index_value = forecast.unwrap_or(0);

    Ok(CarbonReading {
        valid_from,
        valid_to,
        forecast_index_value,
        actual_index_value: actual.unwrap_or(forecast_index_value),
        band: index.as_deref().map(Band::from_api).unwrap_or_default(),
    })
}

fn parse_bound(raw: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>, PayloadError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(now),
        Some(s) => parse_timestamp(s).ok_or_else(|| PayloadError::Timestamp(s.to_string())),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, PATH_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
}
