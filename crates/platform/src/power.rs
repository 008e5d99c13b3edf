//! Power source trait and snapshot type.

use color_eyre::eyre::Result;

use crate::types::ChargeState;

/// Power state snapshot taken by the last [`PowerSource::refresh`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerInfo {
    /// External power (charger) is connected.
    pub ac_powered: bool,

    /// Power flowing in from the adapter, in watts. 0 when on battery or when
    /// the platform does not report it.
    pub draw_watts: f32,

    pub state: ChargeState,
}

/// Trait for platform-specific AC power providers.
pub trait PowerSource {
    /// Create a new provider and take an initial reading.
    fn new() -> Result<Self>
    where
        Self: Sized;

    /// Refresh power information from the system.
    fn refresh(&mut self) -> Result<()>;

    /// Get the most recent power information.
    fn info(&self) -> &PowerInfo;

    fn is_ac_powered(&self) -> bool {
        self.info().ac_powered
    }

    fn current_power_draw_watts(&self) -> f32 {
        self.info().draw_watts
    }

    /// Check if this provider can read power state on this system.
    fn is_supported() -> bool
    where
        Self: Sized,
    {
        true
    }
}
