use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum RegionCommands {
    /// List GB regions (default)
    #[command(alias = "ls")]
    List,

    /// Use a region's data instead of national data
    Set {
        /// Region id (1-17) or name, e.g. 13 or "London"
        region: String,
    },

    /// Go back to national data
    Clear,
}
