//! Turns the head of a forecast into a short "when to charge" recommendation.

use std::fmt;

use crate::error::AdvisorError;
use crate::reading::{Band, CarbonReading};

/// Number of leading forecast intervals the advice is based on.
pub const ADVICE_INTERVALS: usize = 3;

const UNRANKED: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    ChargeNow,
    InHalfAnHour,
    InAnHour,
    WhenNeeded,
}

impl Advice {
    pub fn message(&self) -> &'static str {
        match self {
            Advice::ChargeNow => "Charge now if needed",
            Advice::InHalfAnHour => "Charge in 30 minutes time",
            Advice::InAnHour => "Charge in an hour or so",
            Advice::WhenNeeded => "Charge when needed",
        }
    }

    /// Pick advice from the severity ranks of the next three intervals.
    pub fn from_ranks(now: u8, next: u8, later: u8) -> Self {
        if now <= next && now < later {
            Advice::ChargeNow
        } else if now > next {
            Advice::InHalfAnHour
        } else if now > later {
            Advice::InAnHour
        } else {
            Advice::WhenNeeded
        }
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Severity rank of a band; lower is cleaner. Unknown bands rank worst.
pub fn rank(band: Band) -> u8 {
    match band {
        Band::VeryLow => 1,
        Band::Low => 2,
        Band::Moderate => 3,
        Band::High => 4,
        Band::VeryHigh => 5,
        Band::Unknown => UNRANKED,
    }
}

pub fn advise(forecast: &[CarbonReading]) -> Result<Advice, AdvisorError> {
    match forecast {
        [now, next, later, ..] => Ok(Advice::from_ranks(
            rank(now.band),
            rank(next.band),
            rank(later.band),
        )),
        _ => Err(AdvisorError::InsufficientIntervals {
            got: forecast.len(),
        }),
    }
}
