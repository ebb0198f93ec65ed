use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use super::wire::{AverageResponse, BubbleResponse, BubbleRow, CauseRow, LineRow};
use super::{DataSource, FetchError, TopologyCache};
use crate::data::filter::YearRange;
use crate::data::loader::load_databank;
use crate::data::model::{Indicator, RawRecord};
use crate::data::topology::WorldMap;

// ---------------------------------------------------------------------------
// DatabankSource – the API queries, answered from a local export
// ---------------------------------------------------------------------------

/// Answers the chart queries from a long-format databank file, with the same
/// aggregations the statistics API performs.
pub struct DatabankSource {
    path: PathBuf,
    records: Vec<RawRecord>,
    topology: TopologyCache,
}

impl DatabankSource {
    pub fn open(path: &Path, topology: TopologyCache) -> Result<Self> {
        let records = load_databank(path)?;
        log::info!("Loaded {} databank rows from {}", records.len(), path.display());
        Ok(Self::from_records(path, records, topology))
    }

    pub fn from_records(path: impl Into<PathBuf>, records: Vec<RawRecord>, topology: TopologyCache) -> Self {
        DatabankSource {
            path: path.into(),
            records,
            topology,
        }
    }

    /// Observed rows of `indicator` inside `range`.
    fn observed(&self, indicator: Indicator, range: YearRange) -> impl Iterator<Item = (&RawRecord, f64)> {
        self.records
            .iter()
            .filter(move |r| r.indicator == indicator && range.contains(r.year))
            .filter_map(|r| Some((r, r.value?)))
    }
}

/// Running mean.
#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        self.sum / self.count as f64
    }
}

impl DataSource for DatabankSource {
    fn describe(&self) -> String {
        format!("Databank {}", self.path.display())
    }

    fn average_life_expectancy(&self, range: YearRange) -> Result<AverageResponse, FetchError> {
        let mut means: BTreeMap<String, Mean> = BTreeMap::new();
        for (rec, value) in self.observed(Indicator::LifeExpectancy, range) {
            means.entry(rec.entity.to_string()).or_default().add(value);
        }
        Ok(means.into_iter().map(|(code, m)| (code, m.value())).collect())
    }

    /// Pivot of the three bubble indicators per country and year. Every year
    /// of the range is present, possibly with no rows.
    fn bubble_rows(&self, range: YearRange) -> Result<BubbleResponse, FetchError> {
        let mut pivot: BTreeMap<(i32, String, String), BubbleRow> = BTreeMap::new();
        for indicator in [Indicator::HealthExpenditure, Indicator::LifeExpectancy, Indicator::Population] {
            for (rec, value) in self.observed(indicator, range) {
                let key = (rec.year, rec.name.clone(), rec.entity.to_string());
                let row = pivot.entry(key).or_insert_with(|| BubbleRow {
                    code: Some(rec.entity.to_string()),
                    name: rec.name.clone(),
                    region: None,
                    health_exp: None,
                    life_exp: None,
                    population: None,
                });
                if row.region.is_none() {
                    row.region = rec.region.clone().filter(|r| !r.is_empty());
                }
                let slot = match indicator {
                    Indicator::HealthExpenditure => &mut row.health_exp,
                    Indicator::LifeExpectancy => &mut row.life_exp,
                    _ => &mut row.population,
                };
                *slot = Some(slot.map_or(value, |v| v.max(value)));
            }
        }

        let mut response: BubbleResponse = range.years().map(|y| (y, Vec::new())).collect();
        for ((year, _, _), row) in pivot {
            response.entry(year).or_default().push(row);
        }
        Ok(response)
    }

    /// Mean share of each cause of death across countries, per year.
    fn death_causes(&self, range: YearRange) -> Result<Vec<CauseRow>, FetchError> {
        let mut means: BTreeMap<(i32, Indicator), Mean> = BTreeMap::new();
        for cause in Indicator::DEATH_CAUSES {
            for (rec, value) in self.observed(cause, range) {
                means.entry((rec.year, cause)).or_default().add(value);
            }
        }
        let mut rows: Vec<CauseRow> = means
            .into_iter()
            .map(|((date, cause), mean)| CauseRow {
                date,
                name: cause.label().to_string(),
                category: None,
                value: mean.value(),
            })
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(b.value.total_cmp(&a.value)));
        Ok(rows)
    }

    fn life_expectancy(&self, range: YearRange) -> Result<Vec<LineRow>, FetchError> {
        let mut rows: Vec<LineRow> = self
            .observed(Indicator::LifeExpectancy, range)
            .map(|(rec, value)| LineRow {
                date: rec.year,
                name: rec.name.clone(),
                value: Some(value),
            })
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    fn world_topology(&self) -> Result<Arc<WorldMap>, FetchError> {
        self.topology.get()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data::model::EntityCode;

    fn rec(code: &str, name: &str, indicator: Indicator, year: i32, value: Option<f64>) -> RawRecord {
        RawRecord {
            entity: EntityCode::from(code),
            name: name.into(),
            region: Some("Europe".into()),
            indicator,
            year,
            value,
        }
    }

    fn source() -> DatabankSource {
        use Indicator::*;
        let records = vec![
            rec("FR", "France", LifeExpectancy, 2000, Some(79.0)),
            rec("FR", "France", LifeExpectancy, 2002, Some(80.0)),
            rec("FR", "France", LifeExpectancy, 1990, Some(77.0)),
            rec("FR", "France", HealthExpenditure, 2000, Some(10.0)),
            rec("FR", "France", Population, 2000, Some(60e6)),
            rec("DE", "Germany", LifeExpectancy, 2002, None),
            rec("DE", "Germany", HealthExpenditure, 2001, Some(11.0)),
            rec("FR", "France", DeathsInjury, 2000, Some(6.0)),
            rec("DE", "Germany", DeathsInjury, 2000, Some(4.0)),
            rec("FR", "France", DeathsNonCommunicable, 2000, Some(88.0)),
        ];
        DatabankSource::from_records("test.parquet", records, TopologyCache::new("world.json"))
    }

    #[test]
    fn averages_only_observed_years_in_range() {
        let averages = source().average_life_expectancy(YearRange::new(2000, 2005)).unwrap();
        assert_eq!(averages.len(), 1);
        assert_relative_eq!(averages["FR"], 79.5);
    }

    #[test]
    fn bubble_pivot_has_every_year() {
        let response = source().bubble_rows(YearRange::new(2000, 2003)).unwrap();
        assert_eq!(response.keys().copied().collect::<Vec<_>>(), vec![2000, 2001, 2002, 2003]);
        assert!(response[&2003].is_empty());

        let france = &response[&2000][0];
        assert_eq!(france.code.as_deref(), Some("FR"));
        assert_eq!(france.health_exp, Some(10.0));
        assert_eq!(france.life_exp, Some(79.0));
        assert_eq!(france.population, Some(60e6));

        let germany = &response[&2001][0];
        assert_eq!(germany.name, "Germany");
        assert_eq!(germany.life_exp, None);
    }

    #[test]
    fn death_causes_are_means_sorted_per_year() {
        let rows = source().death_causes(YearRange::new(2000, 2000)).unwrap();
        let got: Vec<(&str, f64)> = rows.iter().map(|r| (r.name.as_str(), r.value)).collect();
        assert_eq!(got, vec![("Non-communicable Diseases", 88.0), ("Injuries", 5.0)]);
    }

    #[test]
    fn life_expectancy_rows_skip_missing_values() {
        let rows = source().life_expectancy(YearRange::new(2000, 2002)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.name == "France"));
        assert_eq!(rows[0].date, 2000);
    }

    #[test]
    fn open_reports_load_errors() {
        let err = DatabankSource::open(Path::new("databank.xlsx"), TopologyCache::new("world.json"));
        assert!(err.is_err());
    }
}
