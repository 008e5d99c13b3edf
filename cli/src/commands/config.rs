use color_eyre::eyre::{eyre, Result};

use crate::config::{cache_dir, config_path, UserConfig};

pub fn run(path: bool, reset: bool, edit: bool) -> Result<()> {
    let config_file = config_path();

    if path {
        println!("{}", config_file.display());
        return Ok(());
    }

    if reset {
        // The region preference survives a reset.
        let region = UserConfig::try_load().ok().and_then(|c| c.region);
        let config = UserConfig {
            region,
            ..UserConfig::default()
        };
        config.save()?;
        println!("Config reset to defaults at: {}", config_file.display());
        return Ok(());
    }

    if edit {
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());

        if !config_file.exists() {
            UserConfig::default().save()?;
        }

        let status = std::process::Command::new(&editor)
            .arg(&config_file)
            .status()?;
        if !status.success() {
            return Err(eyre!("{} exited with {}", editor, status));
        }

        if let Err(e) = UserConfig::try_load() {
            eprintln!("Warning: {:#}", e);
            eprintln!("leaf will use default settings until this is fixed.");
        }
        return Ok(());
    }

    let config = UserConfig::try_load()?;
    println!("Config file: {}", config_file.display());
    if let Some(dir) = cache_dir() {
        println!("Cache dir:   {}", dir.display());
    }
    println!("Data scope:  {}", config.scope().label());
    println!();
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}
