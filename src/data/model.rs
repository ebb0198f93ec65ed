use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Indicator – a named World Bank metric
// ---------------------------------------------------------------------------

/// The World Bank indicators the explorer knows how to chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Indicator {
    HealthExpenditure,
    LifeExpectancy,
    Population,
    DeathsCommunicable,
    DeathsInjury,
    DeathsNonCommunicable,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::HealthExpenditure,
        Indicator::LifeExpectancy,
        Indicator::Population,
        Indicator::DeathsCommunicable,
        Indicator::DeathsInjury,
        Indicator::DeathsNonCommunicable,
    ];

    /// Causes of death, in the order the bar chart colours them.
    pub const DEATH_CAUSES: [Indicator; 3] = [
        Indicator::DeathsCommunicable,
        Indicator::DeathsInjury,
        Indicator::DeathsNonCommunicable,
    ];

    /// World Bank indicator id, as stored in the databank `indicator_id` column.
    pub fn code(self) -> &'static str {
        match self {
            Indicator::HealthExpenditure => "SH.XPD.CHEX.GD.ZS",
            Indicator::LifeExpectancy => "SP.DYN.LE00.IN",
            Indicator::Population => "SP.POP.TOTL",
            Indicator::DeathsCommunicable => "SH.DTH.COMM.ZS",
            Indicator::DeathsInjury => "SH.DTH.INJR.ZS",
            Indicator::DeathsNonCommunicable => "SH.DTH.NCOM.ZS",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ind| ind.code() == code)
    }

    /// Human readable label used in legends and bar labels.
    pub fn label(self) -> &'static str {
        match self {
            Indicator::HealthExpenditure => "Current health expenditure (% of GDP)",
            Indicator::LifeExpectancy => "Life expectancy at birth (years)",
            Indicator::Population => "Population",
            Indicator::DeathsCommunicable => "Communicable Diseases",
            Indicator::DeathsInjury => "Injuries",
            Indicator::DeathsNonCommunicable => "Non-communicable Diseases",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Entity – a country identified by a stable code
// ---------------------------------------------------------------------------

/// Stable entity key (ISO-2 country code, or the display name when a payload
/// carries no code).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCode(pub String);

impl EntityCode {
    pub fn new(code: impl Into<String>) -> Self {
        EntityCode(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EntityCode {
    fn from(s: &str) -> Self {
        EntityCode(s.to_string())
    }
}

/// Static attributes of an entity. `region` is assumed constant over time.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub code: EntityCode,
    pub name: String,
    pub region: Option<String>,
}

// ---------------------------------------------------------------------------
// RawRecord – one row of the long-format databank
// ---------------------------------------------------------------------------

/// A single observation (or reported gap) of one indicator for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub entity: EntityCode,
    pub name: String,
    pub region: Option<String>,
    pub indicator: Indicator,
    pub year: i32,
    pub value: Option<f64>,
}

// ---------------------------------------------------------------------------
// Sample / Series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub year: i32,
    pub value: f64,
}

impl Sample {
    pub fn new(year: i32, value: f64) -> Self {
        Sample { year, value }
    }
}

/// Samples of one (entity, indicator) pair. Years are unique and ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    pub const EMPTY: Series = Series {
        samples: Vec::new(),
    };

    /// Build a series from samples in any order. A later sample for an
    /// already seen year replaces the earlier one.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        let by_year: BTreeMap<i32, f64> = samples
            .into_iter()
            .map(|s| (s.year, s.value))
            .collect();
        Series {
            samples: by_year
                .into_iter()
                .map(|(year, value)| Sample { year, value })
                .collect(),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.samples.first().map(|s| s.year)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.samples.last().map(|s| s.year)
    }
}

// ---------------------------------------------------------------------------
// Frame – fully resolved snapshot for one year
// ---------------------------------------------------------------------------

/// One entity's joined record inside a [`Frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct FramePoint {
    pub name: String,
    pub region: Option<String>,
    pub health_exp: f64,
    pub life_exp: f64,
    pub population: f64,
}

/// Per-year snapshot across all entities after interpolation and validity
/// filtering. Entities without a valid record are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub year: i32,
    pub points: BTreeMap<EntityCode, FramePoint>,
}

impl Frame {
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_codes_round_trip() {
        for ind in Indicator::ALL {
            assert_eq!(Indicator::from_code(ind.code()), Some(ind));
        }
        assert_eq!(Indicator::from_code("NY.GDP.MKTP.CD"), None);
    }

    #[test]
    fn series_sorts_and_keeps_last_duplicate() {
        let series = Series::from_samples([
            Sample::new(2010, 20.0),
            Sample::new(2000, 10.0),
            Sample::new(2010, 25.0),
        ]);
        let years: Vec<i32> = series.samples().iter().map(|s| s.year).collect();
        assert_eq!(years, vec![2000, 2010]);
        assert_eq!(series.samples()[1].value, 25.0);
        assert_eq!(series.first_year(), Some(2000));
        assert_eq!(series.last_year(), Some(2010));
    }
}
