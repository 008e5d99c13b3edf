use color_eyre::eyre::Result;

use crate::config::UserConfig;
use crate::presenter;

pub fn run(config: &UserConfig, json: bool) -> Result<()> {
    let mut monitor = super::system_monitor(config)?;
    let update = monitor.poll()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&presenter::to_json(&update))?);
        return Ok(());
    }

    let power = if update.charging {
        format!("charging at {:.1}W", update.draw_watts)
    } else {
        "on battery".to_string()
    };
    println!("{} ({})", update.scope.label(), power);
    println!("Intensity: {} gCO₂/kWh", update.intensity);
    for line in presenter::render_lines(&update) {
        println!("{}", line);
    }

    if config.region.is_none() {
        println!();
        println!("Using national data. Set your region with `leaf region set <id|name>`.");
    }

    Ok(())
}
