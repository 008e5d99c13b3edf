mod region;

pub use region::RegionCommands;

use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll on a timer and print each update (default)
    #[command(alias = "watch")]
    Run,

    /// Poll once and print the current figures
    Status {
        #[arg(short, long)]
        json: bool,
    },

    /// Show the forecast window and charging advice
    Forecast,

    /// Clear all cached data and running totals
    Reset {
        #[arg(short = 'y', long)]
        yes: bool,
    },

    Region {
        #[command(subcommand)]
        command: Option<RegionCommands>,
    },

    Debug,

    Config {
        #[arg(long)]
        path: bool,

        #[arg(long)]
        reset: bool,

        #[arg(short, long)]
        edit: bool,
    },

    Logs {
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,

        #[arg(short, long)]
        follow: bool,
    },
}

/// Carbon emissions of charging your laptop, from GB grid intensity data.
#[derive(Debug, Parser)]
#[command(name = "leaf", version, verbatim_doc_comment)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}
