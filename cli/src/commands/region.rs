use color_eyre::eyre::{eyre, Result};
use tracing::info;

use leaf_carbon::Region;

use crate::cli::RegionCommands;
use crate::config::{config_path, UserConfig};

pub fn run(command: Option<RegionCommands>) -> Result<()> {
    match command.unwrap_or(RegionCommands::List) {
        RegionCommands::List => list(),
        RegionCommands::Set { region } => set(&region),
        RegionCommands::Clear => clear(),
    }
}

fn list() -> Result<()> {
    let current = UserConfig::load().region;

    for region in Region::all() {
        let marker = if Some(region.id) == current { "*" } else { " " };
        println!("{} {:>2}  {}", marker, region.id, region.name);
    }

    if current.is_none() {
        println!();
        println!("No region set, national data is used.");
    }
    Ok(())
}

fn set(input: &str) -> Result<()> {
    let region = Region::parse(input).ok_or_else(|| {
        eyre!(
            "Unknown region '{}'. Run `leaf region list` for valid ids and names.",
            input
        )
    })?;

    let mut config = UserConfig::try_load()?;
    config.region = Some(region.id);
    config.save()?;

    info!(region = region.id, name = region.name, "Region set");
    println!("Region set to {} ({})", region.name, region.id);
    println!("Saved to {}", config_path().display());
    Ok(())
}

fn clear() -> Result<()> {
    let mut config = UserConfig::try_load()?;
    config.region = None;
    config.save()?;

    info!("Region cleared");
    println!("Region cleared, national data will be used.");
    Ok(())
}
