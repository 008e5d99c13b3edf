pub mod config;
pub mod debug;
pub mod forecast;
pub mod logs;
pub mod region;
pub mod reset;
pub mod run;
pub mod status;

use color_eyre::eyre::{Result, WrapErr};
use tracing::debug;

use leaf_carbon::{DiskStore, Endpoints, HttpFetcher, ImpactAccumulator, IntensityClient, TypedCache};
use leaf_platform::{PowerSource, SystemPower};

use crate::config::{ensure_cache_dir, UserConfig};
use crate::monitor::Monitor;

/// Open the cache root. Failing to resolve or create it is fatal.
pub fn open_cache() -> Result<TypedCache> {
    let root = ensure_cache_dir()?;
    let store = DiskStore::open(&root)
        .wrap_err_with(|| format!("Failed to open cache at {}", root.display()))?;
    debug!(root = ?root, "Opened cache");
    Ok(TypedCache::new(store))
}

pub fn intensity_client(config: &UserConfig, cache: TypedCache) -> IntensityClient<HttpFetcher> {
    IntensityClient::new(HttpFetcher::new(config.request_timeout()), cache)
        .with_endpoints(Endpoints::new(config.api_base_url.as_str()))
        .with_policy(config.freshness_policy())
        .with_forecast_window(config.forecast_window_mins)
}

pub fn system_monitor(config: &UserConfig) -> Result<Monitor<SystemPower, HttpFetcher>> {
    let cache = open_cache()?;
    let power = SystemPower::new().wrap_err("Failed to read power state")?;
    let client = intensity_client(config, cache.clone());
    Ok(Monitor::new(
        power,
        client,
        ImpactAccumulator::new(cache),
        config.scope(),
    )
    .with_session_gap(config.session_gap()))
}
