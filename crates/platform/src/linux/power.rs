use std::fs;
use std::path::Path;

use color_eyre::eyre::Result;
use systemstat::{Platform, System};
use tracing::debug;

use crate::generic::read_battery;
use crate::power::{PowerInfo, PowerSource};
use crate::types::ChargeState;

const POWER_SUPPLY_PATH: &str = "/sys/class/power_supply";

/// Mains state from systemstat, falling back to sysfs. Draw is the battery's
/// charge rate while it is charging; machines without a battery report 0.
pub struct LinuxPower {
    info: PowerInfo,
    system: System,
}

impl PowerSource for LinuxPower {
    fn new() -> Result<Self> {
        let mut provider = Self {
            info: PowerInfo::default(),
            system: System::new(),
        };
        provider.refresh()?;
        Ok(provider)
    }

    fn refresh(&mut self) -> Result<()> {
        let ac_powered = match self.system.on_ac_power() {
            Ok(on_ac) => on_ac,
            Err(e) => {
                debug!(error = %e, "systemstat could not read AC state, scanning sysfs");
                mains_online(Path::new(POWER_SUPPLY_PATH))
            }
        };

        let battery = match read_battery() {
            Ok(reading) => Some(reading),
            Err(e) => {
                debug!(error = %e, "No battery reading");
                None
            }
        };

        let (state, draw_watts) = match battery {
            Some((ChargeState::Charging, rate)) if ac_powered => (ChargeState::Charging, rate),
            Some((ChargeState::Full, _)) if ac_powered => (ChargeState::Full, 0.0),
            _ if ac_powered => (ChargeState::NotCharging, 0.0),
            _ => (ChargeState::Discharging, 0.0),
        };

        self.info = PowerInfo {
            ac_powered,
            draw_watts,
            state,
        };
        debug!(
            ac_powered,
            draw_watts,
            state = %state,
            "Refreshed adapter power"
        );
        Ok(())
    }

    fn info(&self) -> &PowerInfo {
        &self.info
    }

    fn is_supported() -> bool {
        Path::new(POWER_SUPPLY_PATH).exists()
    }
}

/// True if any `Mains` supply under `root` reports `online == 1`.
fn mains_online(root: &Path) -> bool {
    let Ok(entries) = fs::read_dir(root) else {
        return false;
    };

    entries.flatten().any(|entry| {
        let path = entry.path();
        let is_mains = fs::read_to_string(path.join("type"))
            .map(|t| t.trim() == "Mains")
            .unwrap_or(false);
        is_mains
            && fs::read_to_string(path.join("online"))
                .map(|o| o.trim() == "1")
                .unwrap_or(false)
    })
}
