//! Portable provider built only on the battery crate.
//!
//! The battery crate has no notion of the adapter itself, so AC power is
//! inferred from the charge state and the draw is the battery's charge rate.

use color_eyre::eyre::{eyre, Result};
use starship_battery::units::power::watt;
use starship_battery::Manager;
use tracing::debug;

use crate::power::{PowerInfo, PowerSource};
use crate::types::ChargeState;

pub struct BatteryPower {
    info: PowerInfo,
}

impl PowerSource for BatteryPower {
    fn new() -> Result<Self> {
        let mut provider = Self {
            info: PowerInfo::default(),
        };
        provider.refresh()?;
        Ok(provider)
    }

    fn refresh(&mut self) -> Result<()> {
        let (state, rate) = read_battery()?;

        self.info.state = state;
        self.info.ac_powered = state.is_plugged_in();
        self.info.draw_watts = if state == ChargeState::Charging {
            rate
        } else {
            0.0
        };

        debug!(
            state = %self.info.state,
            draw_watts = self.info.draw_watts,
            "Refreshed battery power"
        );
        Ok(())
    }

    fn info(&self) -> &PowerInfo {
        &self.info
    }

    fn is_supported() -> bool {
        read_battery().is_ok()
    }
}

/// Charge state and absolute energy rate (watts) of the first battery.
///
/// A fresh manager per call keeps providers free of the battery crate's
/// non-`Send` handles.
pub(crate) fn read_battery() -> Result<(ChargeState, f32)> {
    let manager = Manager::new()?;
    let mut battery = manager
        .batteries()?
        .next()
        .ok_or_else(|| eyre!("No battery found"))??;

    manager.refresh(&mut battery)?;

    let rate = battery.energy_rate().get::<watt>().abs();
    Ok((ChargeState::from(battery.state()), rate))
}
