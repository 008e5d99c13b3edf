//! GB regions served by the carbon-intensity API.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub id: u8,
    pub name: &'static str,
}

static REGIONS: [Region; 17] = [
    Region { id: 1, name: "North Scotland" },
    Region { id: 2, name: "South Scotland" },
    Region { id: 3, name: "North West England" },
    Region { id: 4, name: "North East England" },
    Region { id: 5, name: "Yorkshire" },
    Region { id: 6, name: "North Wales" },
    Region { id: 7, name: "South Wales" },
    Region { id: 8, name: "West Midlands" },
    Region { id: 9, name: "East Midlands" },
    Region { id: 10, name: "East England" },
    Region { id: 11, name: "South West England" },
    Region { id: 12, name: "South England" },
    Region { id: 13, name: "London" },
    Region { id: 14, name: "South East England" },
    Region { id: 15, name: "England" },
    Region { id: 16, name: "Scotland" },
    Region { id: 17, name: "Wales" },
];

impl Region {
    pub fn all() -> &'static [Region] {
        &REGIONS
    }

    pub fn from_id(id: u8) -> Option<&'static Region> {
        REGIONS.iter().find(|r| r.id == id)
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<&'static Region> {
        let name = name.trim();
        REGIONS.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Accepts either a numeric id or a display name.
    pub fn parse(input: &str) -> Option<&'static Region> {
        match input.trim().parse::<u8>() {
            Ok(id) => Self::from_id(id),
            Err(_) => Self::from_name(input),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Which slice of the grid intensity data is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    National,
    Regional(u8),
}

impl Scope {
    /// Map the persisted region preference; absence means national data.
    pub fn from_preference(region: Option<u8>) -> Self {
        match region {
            Some(id) => Scope::Regional(id),
            None => Scope::National,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::National => "National".to_string(),
            Scope::Regional(id) => Region::from_id(*id)
                .map(|r| r.name.to_string())
                .unwrap_or_else(|| format!("Region {}", id)),
        }
    }
}
