//! AC power state and charging draw for leaf.
//!
//! Every platform exposes the same [`PowerSource`] trait; [`SystemPower`]
//! names the implementation selected for the current target and features.
//!
//! # Features
//!
//! - `macos` - Read the smart battery registry entry via `ioreg`
//! - `linux` - Read mains state via systemstat and draw via the battery crate
//!
//! # Example
//!
//! ```ignore
//! use leaf_platform::{PowerSource, SystemPower};
//!
//! let mut power = SystemPower::new()?;
//! power.refresh()?;
//! if power.is_ac_powered() {
//!     println!("Drawing {:.1} W", power.current_power_draw_watts());
//! }
//! ```

mod generic;
mod power;
mod types;

pub use generic::BatteryPower;
pub use power::{PowerInfo, PowerSource};
pub use types::ChargeState;

#[cfg(target_os = "macos")]
#[cfg(feature = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
#[cfg(feature = "linux")]
pub mod linux;

#[cfg(all(target_os = "macos", feature = "macos"))]
pub type SystemPower = macos::MacOSPower;

#[cfg(all(target_os = "linux", feature = "linux"))]
pub type SystemPower = linux::LinuxPower;

#[cfg(not(any(
    all(target_os = "macos", feature = "macos"),
    all(target_os = "linux", feature = "linux")
)))]
pub type SystemPower = generic::BatteryPower;
