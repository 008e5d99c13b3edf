use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use humantime::format_duration;
use serde::de::DeserializeOwned;

use leaf_carbon::accumulator::TOTALS_KEY;
use leaf_carbon::api::{self, DataKind};
use leaf_carbon::cache::ValidityWindow;
use leaf_carbon::{CachedEnvelope, CarbonReading, FreshnessPolicy, SessionTotals, TypedCache};
use leaf_platform::{PowerSource, SystemPower};

use crate::config::{self, config_path, UserConfig};

pub fn run() -> Result<()> {
    println!("leaf debug information");
    println!("{}", "=".repeat(60));

    println!("\n--- Power Source ---");
    match SystemPower::new() {
        Ok(power) => {
            let info = power.info();
            println!("AC powered: {}", info.ac_powered);
            println!("State: {}", info.state);
            println!("Draw: {:.2}W", info.draw_watts);
        }
        Err(e) => println!("Unavailable: {:#}", e),
    }

    println!("\n--- Paths ---");
    println!("Config: {}", config_path().display());
    match config::cache_dir() {
        Some(dir) => println!("Cache: {}", dir.display()),
        None => println!("Cache: <unresolved>"),
    }
    println!("Logs: {}", config::runtime_dir().display());

    let config = match UserConfig::try_load() {
        Ok(config) => config,
        Err(e) => {
            println!("\nConfig error: {:#}", e);
            UserConfig::default()
        }
    };

    println!("\n--- Cache ---");
    let cache = super::open_cache()?;
    let scope = config.scope();
    let policy = config.freshness_policy();
    let now = Utc::now();
    print_entry::<CarbonReading>(&cache, &api::cache_key(scope, DataKind::Current), policy, now);
    print_entry::<Vec<CarbonReading>>(
        &cache,
        &api::cache_key(scope, DataKind::Forecast),
        policy,
        now,
    );
    match cache.fetch::<SessionTotals>(TOTALS_KEY) {
        Ok(totals) => println!(
            "{}: session {:.2}, lifetime {:.2}, {} samples",
            TOTALS_KEY,
            totals.session_grams,
            totals.lifetime_grams,
            totals.samples.len()
        ),
        Err(e) => println!("{}: {}", TOTALS_KEY, e),
    }

    println!("\n--- Current Config ---");
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

fn print_entry<T>(cache: &TypedCache, key: &str, policy: FreshnessPolicy, now: DateTime<Utc>)
where
    T: DeserializeOwned + ValidityWindow,
{
    match cache.fetch::<CachedEnvelope<T>>(key) {
        Ok(envelope) => {
            let age = (now - envelope.fetched_at).to_std().unwrap_or_default();
            let age = std::time::Duration::from_secs(age.as_secs());
            println!(
                "{}: fetched {} ago, {:?}",
                key,
                format_duration(age),
                policy.evaluate(&envelope, now)
            );
        }
        Err(e) => println!("{}: {}", key, e),
    }
}
