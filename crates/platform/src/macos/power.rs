use std::process::Command;

use color_eyre::eyre::{eyre, Result};
use plist::{Dictionary, Value};
use tracing::{debug, trace};

use crate::power::{PowerInfo, PowerSource};
use crate::types::ChargeState;

const IOREG: &str = "ioreg";
const SMART_BATTERY: &str = "AppleSmartBattery";

/// Reads the `AppleSmartBattery` registry entry through `ioreg -a`.
///
/// Adapter power comes from `BatteryData.AdapterPower`, an integer holding
/// the bit pattern of an `f32`. Machines that do not publish it fall back to
/// `PowerTelemetryData.SystemPowerIn` (milliwatts).
pub struct MacOSPower {
    info: PowerInfo,
}

impl PowerSource for MacOSPower {
    fn new() -> Result<Self> {
        let mut provider = Self {
            info: PowerInfo::default(),
        };
        provider.refresh()?;
        Ok(provider)
    }

    fn refresh(&mut self) -> Result<()> {
        let output = Command::new(IOREG)
            .args(["-rn", SMART_BATTERY, "-a"])
            .output()?;

        if !output.status.success() {
            return Err(eyre!("{} exited with {}", IOREG, output.status));
        }

        self.info = parse_registry(&output.stdout)?;
        debug!(
            ac_powered = self.info.ac_powered,
            draw_watts = self.info.draw_watts,
            state = %self.info.state,
            "Refreshed adapter power"
        );
        Ok(())
    }

    fn info(&self) -> &PowerInfo {
        &self.info
    }

    fn is_supported() -> bool {
        Command::new(IOREG)
            .args(["-rn", SMART_BATTERY, "-a"])
            .output()
            .map(|o| o.status.success() && parse_registry(&o.stdout).is_ok())
            .unwrap_or(false)
    }
}

/// Parse `ioreg -a` output: an array holding one dictionary per match.
fn parse_registry(bytes: &[u8]) -> Result<PowerInfo> {
    let value: Value = plist::from_bytes(bytes)?;
    let entry = match &value {
        Value::Array(items) => items.iter().find_map(Value::as_dictionary),
        Value::Dictionary(dict) => Some(dict),
        _ => None,
    }
    .ok_or_else(|| eyre!("No {} entry in registry output", SMART_BATTERY))?;

    let external_connected = flag(entry, "ExternalConnected");
    let is_charging = flag(entry, "IsCharging");
    let fully_charged = flag(entry, "FullyCharged");

    let draw_watts = if external_connected {
        adapter_power(entry)
            .or_else(|| system_power_in(entry))
            .unwrap_or(0.0)
    } else {
        0.0
    };

    Ok(PowerInfo {
        ac_powered: external_connected,
        draw_watts,
        state: ChargeState::from_flags(external_connected, is_charging, fully_charged),
    })
}

fn flag(dict: &Dictionary, key: &str) -> bool {
    dict.get(key).and_then(Value::as_boolean).unwrap_or(false)
}

fn integer(value: &Value) -> Option<u64> {
    value
        .as_unsigned_integer()
        .or_else(|| value.as_signed_integer().map(|v| v as u64))
}

fn adapter_power(entry: &Dictionary) -> Option<f32> {
    let raw = entry
        .get("BatteryData")
        .and_then(Value::as_dictionary)?
        .get("AdapterPower")
        .and_then(integer)?;

    let watts = f32::from_bits(raw as u32);
    trace!(raw, watts, "AdapterPower");
    (watts.is_finite() && watts >= 0.0).then_some(watts)
}

fn system_power_in(entry: &Dictionary) -> Option<f32> {
    let milliwatts = entry
        .get("PowerTelemetryData")
        .and_then(Value::as_dictionary)?
        .get("SystemPowerIn")
        .and_then(integer)?;

    Some(milliwatts as f32 / 1000.0)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn registry(body: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<array>
<dict>
{body}
</dict>
</array>
</plist>"#
        )
        .into_bytes()
    }

    #[test]
    fn test_adapter_power_bit_pattern() {
        let bits = 61.5f32.to_bits();
        let xml = registry(&format!(
            "<key>ExternalConnected</key><true/>
             <key>IsCharging</key><true/>
             <key>BatteryData</key><dict><key>AdapterPower</key><integer>{bits}</integer></dict>"
        ));

        let info = parse_registry(&xml).unwrap();
        assert!(info.ac_powered);
        assert_eq!(info.draw_watts, 61.5);
        assert_eq!(info.state, ChargeState::Charging);
    }

    #[test]
    fn test_falls_back_to_system_power_in() {
        let xml = registry(
            "<key>ExternalConnected</key><true/>
             <key>IsCharging</key><false/>
             <key>FullyCharged</key><true/>
             <key>PowerTelemetryData</key><dict><key>SystemPowerIn</key><integer>12500</integer></dict>",
        );

        let info = parse_registry(&xml).unwrap();
        assert_eq!(info.draw_watts, 12.5);
        assert_eq!(info.state, ChargeState::Full);
    }

    #[test]
    fn test_on_battery_reports_no_draw() {
        let bits = 30.0f32.to_bits();
        let xml = registry(&format!(
            "<key>ExternalConnected</key><false/>
             <key>BatteryData</key><dict><key>AdapterPower</key><integer>{bits}</integer></dict>"
        ));

        let info = parse_registry(&xml).unwrap();
        assert!(!info.ac_powered);
        assert_eq!(info.draw_watts, 0.0);
        assert_eq!(info.state, ChargeState::Discharging);
    }

    #[test]
    fn test_empty_output_is_error() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><array/></plist>"#;
        assert!(parse_registry(xml).is_err());
    }
}
