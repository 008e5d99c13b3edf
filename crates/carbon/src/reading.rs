use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::ValidityWindow;

/// Qualitative carbon-intensity band reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
    #[default]
    Unknown,
}

impl Band {
    /// Parse the provider's index string. The API spells bands with spaces
    /// ("very high"); underscores and "medium" are accepted as well.
    /// Anything else is [`Band::Unknown`].
    pub fn from_api(index: &str) -> Self {
        let normalized = index.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "very low" => Band::VeryLow,
            "low" => Band::Low,
            "moderate" | "medium" => Band::Moderate,
            "high" => Band::High,
            "very high" => Band::VeryHigh,
            _ => Band::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Band::VeryLow => "very low",
            Band::Low => "low",
            Band::Moderate => "moderate",
            Band::High => "high",
            Band::VeryHigh => "very high",
            Band::Unknown => "unknown",
        }
    }

    /// High and very high intensity: a bad time to plug in.
    pub fn discourages_charging(&self) -> bool {
        matches!(self, Band::High | Band::VeryHigh)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One normalized carbon-intensity interval.
///
/// Produced only by the intensity client's normalization step, so every field
/// is populated: a missing `actual` has already been replaced by `forecast`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarbonReading {
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub forecast_index_value: i32,
    pub actual_index_value: i32,
    pub band: Band,
}

impl CarbonReading {
    /// Intensity used for impact accounting (gCO2/kWh as supplied).
    pub fn intensity(&self) -> i32 {
        self.actual_index_value
    }
}

impl ValidityWindow for CarbonReading {
    fn valid_to(&self) -> Option<DateTime<Utc>> {
        Some(self.valid_to)
    }
}

/// A forecast is only as fresh as its first (current) interval.
impl ValidityWindow for Vec<CarbonReading> {
    fn valid_to(&self) -> Option<DateTime<Utc>> {
        self.first().map(|r| r.valid_to)
    }
}
