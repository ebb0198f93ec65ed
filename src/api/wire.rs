use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::model::{EntityCode, Indicator, RawRecord};

// ---------------------------------------------------------------------------
// Response bodies of the statistics API
// ---------------------------------------------------------------------------

/// `/avg-values/{s}/{e}`: country code → average life expectancy.
pub type AverageResponse = BTreeMap<String, f64>;

/// `/bubble-data/{s}/{e}`: year → one row per country.
pub type BubbleResponse = BTreeMap<i32, Vec<BubbleRow>>;

/// One country in one year of the bubble payload. Any indicator may be
/// missing; the client interpolates the gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub health_exp: Option<f64>,
    #[serde(default)]
    pub life_exp: Option<f64>,
    #[serde(default)]
    pub population: Option<f64>,
}

/// `/bar-chart-data/{s}/{e}`: one cause-of-death share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseRow {
    pub date: i32,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub value: f64,
}

/// `/line-chart-data/{s}/{e}`: one life-expectancy observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRow {
    pub date: i32,
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Flatten the bubble payload into long-format rows. Rows without a code are
/// keyed by their display name.
pub fn bubble_records(response: BubbleResponse) -> Vec<RawRecord> {
    let mut records = Vec::new();
    for (year, rows) in response {
        for row in rows {
            let entity = EntityCode::new(row.code.clone().unwrap_or_else(|| row.name.clone()));
            let values = [
                (Indicator::HealthExpenditure, row.health_exp),
                (Indicator::LifeExpectancy, row.life_exp),
                (Indicator::Population, row.population),
            ];
            records.extend(values.into_iter().map(|(indicator, value)| RawRecord {
                entity: entity.clone(),
                name: row.name.clone(),
                region: row.region.clone(),
                indicator,
                year,
                value,
            }));
        }
    }
    records
}
