use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::Level;

use leaf_carbon::api::{DEFAULT_BASE_URL, DEFAULT_FORECAST_WINDOW_MINS};
use leaf_carbon::cache::DEFAULT_TTL_SECS;
use leaf_carbon::{FreshnessPolicy, Scope};

use crate::monitor::DEFAULT_SESSION_GAP;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Lenient parse for `--log-level`; unknown values mean `info`.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "off" | "none" => LogLevel::Off,
            "error" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warn,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }

    pub fn as_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    #[default]
    ValidityWindow,
    FixedTtl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// GB region id; absent means national data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<u8>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub tick_budget_secs: u64,
    pub api_base_url: String,
    pub forecast_window_mins: i64,
    pub cache_policy: CachePolicy,
    pub cache_ttl_secs: i64,
    pub log_level: LogLevel,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            region: None,
            poll_interval_secs: 120,
            request_timeout_secs: 10,
            tick_budget_secs: 30,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            forecast_window_mins: DEFAULT_FORECAST_WINDOW_MINS,
            cache_policy: CachePolicy::ValidityWindow,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            log_level: LogLevel::Info,
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("leaf")
}

pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("leaf")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Root of the intensity and totals cache, `None` when the platform has no
/// cache directory.
pub fn cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("leaf"))
}

/// Resolve and create the cache root. Running without persistence is not an
/// option, so any failure here is fatal to the caller.
pub fn ensure_cache_dir() -> Result<PathBuf> {
    let dir = cache_dir().ok_or_else(|| eyre!("Could not resolve a cache directory"))?;
    fs::create_dir_all(&dir)
        .wrap_err_with(|| format!("Failed to create cache directory {}", dir.display()))?;
    Ok(dir)
}

impl UserConfig {
    /// Load the config, failing on unreadable or unparseable files. A missing
    /// file is not an error.
    pub fn try_load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn load() -> Self {
        Self::try_load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(config_dir())?;
        let content = toml::to_string_pretty(self)?;
        fs::write(config_path(), content)?;
        Ok(())
    }

    pub fn scope(&self) -> Scope {
        Scope::from_preference(self.region)
    }

    pub fn freshness_policy(&self) -> FreshnessPolicy {
        match self.cache_policy {
            CachePolicy::ValidityWindow => FreshnessPolicy::ValidityWindow,
            CachePolicy::FixedTtl => FreshnessPolicy::fixed_ttl_secs(self.cache_ttl_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn tick_budget(&self) -> Duration {
        Duration::from_secs(self.tick_budget_secs.max(1))
    }

    /// Three missed polls, never less than the monitor's default gap.
    pub fn session_gap(&self) -> Duration {
        (self.poll_interval() * 3).max(DEFAULT_SESSION_GAP)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let config = UserConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(!text.contains("region"));

        let parsed: UserConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: UserConfig = toml::from_str(
            r#"
            region = 13
            cache_policy = "fixed_ttl"
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.scope(), Scope::Regional(13));
        assert_eq!(parsed.scope().label(), "London");
        assert_eq!(parsed.freshness_policy(), FreshnessPolicy::fixed_ttl_secs(1800));
        assert_eq!(parsed.log_level, LogLevel::Debug);
        assert_eq!(parsed.poll_interval(), Duration::from_secs(120));
        assert_eq!(parsed.session_gap(), Duration::from_secs(600));
    }

    #[test]
    fn test_no_region_is_national() {
        let config = UserConfig::default();
        assert_eq!(config.scope(), Scope::National);
        assert_eq!(config.freshness_policy(), FreshnessPolicy::ValidityWindow);
    }

    #[test]
    fn test_session_gap_follows_slow_poll_interval() {
        let config = UserConfig {
            poll_interval_secs: 900,
            ..UserConfig::default()
        };
        assert_eq!(config.session_gap(), Duration::from_secs(2700));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::from_str("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("off"), LogLevel::Off);
        assert_eq!(LogLevel::from_str("loud"), LogLevel::Info);
        assert_eq!(LogLevel::Off.as_tracing_level(), None);
        assert_eq!(LogLevel::Trace.as_tracing_level(), Some(Level::TRACE));
    }
}
