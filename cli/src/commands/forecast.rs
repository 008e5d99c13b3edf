use chrono::Local;
use color_eyre::eyre::Result;
use tracing::warn;

use leaf_carbon::advise;

use crate::config::UserConfig;

pub fn run(config: &UserConfig) -> Result<()> {
    let client = super::intensity_client(config, super::open_cache()?);
    let scope = config.scope();
    let forecast = client.forecast(scope)?;

    println!("{} forecast", scope.label());
    println!("{}", "=".repeat(44));
    println!("{:<13} {:>10}  {}", "Window", "gCO₂/kWh", "Band");
    for interval in &forecast {
        let from = interval.valid_from.with_timezone(&Local).format("%H:%M");
        let to = interval.valid_to.with_timezone(&Local).format("%H:%M");
        println!(
            "{:<13} {:>10}  {}",
            format!("{}-{}", from, to),
            interval.intensity(),
            interval.band
        );
    }
    println!();

    match advise(&forecast) {
        Ok(advice) => println!("{}", advice),
        Err(e) => {
            warn!(error = %e, "Forecast too short for advice");
            println!("Not enough forecast data for advice");
        }
    }

    Ok(())
}
