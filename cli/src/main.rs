mod cli;
mod commands;
mod config;
mod driver;
mod logging;
mod monitor;
mod presenter;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::warn;

use cli::{Cli, Commands};
use config::{LogLevel, UserConfig};
use logging::LogMode;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let (config, config_error) = match UserConfig::try_load() {
        Ok(config) => (config, None),
        Err(e) => (UserConfig::default(), Some(e)),
    };
    let log_level_override = cli.log_level.as_deref().map(LogLevel::from_str);

    let mode = match cli.command {
        None | Some(Commands::Run) => LogMode::Both,
        Some(_) => LogMode::Stderr,
    };
    let _guard = logging::init(config.log_level, mode, log_level_override);

    if let Some(e) = config_error {
        warn!(error = %format!("{:#}", e), "Ignoring unreadable config, using defaults");
    }

    match cli.command {
        None | Some(Commands::Run) => commands::run::run(&config),
        Some(Commands::Status { json }) => commands::status::run(&config, json),
        Some(Commands::Forecast) => commands::forecast::run(&config),
        Some(Commands::Reset { yes }) => commands::reset::run(yes),
        Some(Commands::Region { command }) => commands::region::run(command),
        Some(Commands::Debug) => commands::debug::run(),
        Some(Commands::Config { path, reset, edit }) => commands::config::run(path, reset, edit),
        Some(Commands::Logs { lines, follow }) => commands::logs::run(lines, follow),
    }
}
