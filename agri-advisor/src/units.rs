//! Measurement unit system and the weather view's unit session

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Value of the weather service `units` parameter
    pub fn as_query(self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn temperature_symbol(self) -> &'static str {
        match self {
            UnitSystem::Metric => "C",
            UnitSystem::Imperial => "F",
        }
    }

    pub fn speed_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "km/h",
            UnitSystem::Imperial => "mph",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" | "c" | "celsius" => Ok(UnitSystem::Metric),
            "imperial" | "f" | "fahrenheit" => Ok(UnitSystem::Imperial),
            other => Err(format!("unknown unit system '{}', expected metric or imperial", other)),
        }
    }
}

/// A place query to re-issue after the unit changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refetch {
    pub place: String,
    pub unit: UnitSystem,
}

/// Active unit plus the place name of the reading on screen
#[derive(Debug, Clone, Default)]
pub struct UnitSession {
    unit: UnitSystem,
    displayed_place: Option<String>,
}

impl UnitSession {
    pub fn new(unit: UnitSystem) -> Self {
        Self {
            unit,
            displayed_place: None,
        }
    }

    pub fn unit(&self) -> UnitSystem {
        self.unit
    }

    pub fn displayed_place(&self) -> Option<&str> {
        self.displayed_place.as_deref()
    }

    /// Remember the resolved place name of the reading now displayed
    pub fn record_display(&mut self, place: impl Into<String>) {
        self.displayed_place = Some(place.into());
    }

    /// Flip the unit system
    ///
    /// Returns the place query to re-issue when a reading is displayed.
    /// Always a name lookup, never a new position fix.
    pub fn toggle(&mut self) -> Option<Refetch> {
        self.unit = self.unit.toggled();
        self.displayed_place.clone().map(|place| Refetch {
            place,
            unit: self.unit,
        })
    }
}
