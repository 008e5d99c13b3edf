use color_eyre::eyre::Result;
use tracing::{info, warn};

use crate::config::UserConfig;
use crate::driver::Driver;
use crate::presenter::TextPresenter;

pub fn run(config: &UserConfig) -> Result<()> {
    let monitor = super::system_monitor(config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        scope = %monitor.scope().label(),
        "leaf starting"
    );
    if config.region.is_none() {
        info!("No region set, using national data");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let driver = Driver::new(monitor, config.tick_budget());
    let mut presenter = TextPresenter::new(std::io::stdout());

    runtime.block_on(driver.run(config.poll_interval(), &mut presenter, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }))
}
