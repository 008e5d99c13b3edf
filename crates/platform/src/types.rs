use std::fmt;

/// Battery charging state as seen from the charger's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeState {
    /// Adapter connected and the battery is filling
    Charging,
    /// Running on battery
    Discharging,
    /// Adapter connected, battery full
    Full,
    /// Adapter connected but not charging (e.g., optimized charging hold)
    NotCharging,
    #[default]
    Unknown,
}

impl ChargeState {
    pub fn label(&self) -> &'static str {
        match self {
            ChargeState::Charging => "Charging",
            ChargeState::Discharging => "On Battery",
            ChargeState::Full => "Full",
            ChargeState::NotCharging => "Not Charging",
            ChargeState::Unknown => "Unknown",
        }
    }

    /// Any state where the adapter is supplying power.
    pub fn is_plugged_in(&self) -> bool {
        matches!(
            self,
            ChargeState::Charging | ChargeState::Full | ChargeState::NotCharging
        )
    }

    /// Derive the state from registry-style flags.
    pub fn from_flags(external_connected: bool, is_charging: bool, fully_charged: bool) -> Self {
        match (external_connected, is_charging, fully_charged) {
            (false, _, _) => ChargeState::Discharging,
            (true, true, _) => ChargeState::Charging,
            (true, false, true) => ChargeState::Full,
            (true, false, false) => ChargeState::NotCharging,
        }
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<starship_battery::State> for ChargeState {
    fn from(state: starship_battery::State) -> Self {
        match state {
            starship_battery::State::Charging => ChargeState::Charging,
            starship_battery::State::Discharging => ChargeState::Discharging,
            starship_battery::State::Empty => ChargeState::Discharging,
            starship_battery::State::Full => ChargeState::Full,
            _ => ChargeState::Unknown,
        }
    }
}
