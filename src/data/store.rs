use std::collections::{BTreeMap, HashMap};

use super::filter::YearRange;
use super::model::{Entity, EntityCode, Indicator, RawRecord, Sample, Series};

static EMPTY_SERIES: Series = Series::EMPTY;

// ---------------------------------------------------------------------------
// TimeSeriesStore – sparse samples grouped per entity and indicator
// ---------------------------------------------------------------------------

/// Sparse observations grouped by (entity, indicator), plus the entity table.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesStore {
    entities: BTreeMap<EntityCode, Entity>,
    series: HashMap<(EntityCode, Indicator), Series>,
}

impl TimeSeriesStore {
    /// Group raw rows into per-entity, per-indicator series.
    ///
    /// * Duplicate (entity, indicator, year) rows: the last one wins, even
    ///   when it has no value (the year then has no sample).
    /// * Rows without a value register the entity but add no sample.
    /// * An entity's region is the first non-empty region seen for it.
    pub fn load(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let mut entities: BTreeMap<EntityCode, Entity> = BTreeMap::new();
        let mut pending: HashMap<(EntityCode, Indicator), BTreeMap<i32, Option<f64>>> = HashMap::new();

        for rec in records {
            let entity = entities.entry(rec.entity.clone()).or_insert_with(|| Entity {
                code: rec.entity.clone(),
                name: rec.name.clone(),
                region: None,
            });
            if entity.region.is_none() {
                entity.region = rec.region.clone().filter(|r| !r.is_empty());
            }

            pending
                .entry((rec.entity, rec.indicator))
                .or_default()
                .insert(rec.year, rec.value);
        }

        let series = pending
            .into_iter()
            .filter_map(|(key, by_year)| {
                let samples: Vec<Sample> = by_year
                    .into_iter()
                    .filter_map(|(year, value)| Some(Sample::new(year, value?)))
                    .collect();
                (!samples.is_empty()).then(|| (key, Series::from_samples(samples)))
            })
            .collect();

        TimeSeriesStore { entities, series }
    }

    /// The series for `(entity, indicator)`, or an empty one.
    pub fn series_for(&self, entity: &EntityCode, indicator: Indicator) -> &Series {
        self.series
            .get(&(entity.clone(), indicator))
            .unwrap_or(&EMPTY_SERIES)
    }

    pub fn entity(&self, code: &EntityCode) -> Option<&Entity> {
        self.entities.get(code)
    }

    /// All known entities, ordered by code.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_codes(&self) -> Vec<EntityCode> {
        self.entities.keys().cloned().collect()
    }

    /// Smallest range covering every stored sample.
    pub fn observed_span(&self) -> Option<YearRange> {
        let first = self.series.values().filter_map(Series::first_year).min()?;
        let last = self.series.values().filter_map(Series::last_year).max()?;
        Some(YearRange::new(first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(code: &str, region: Option<&str>, indicator: Indicator, year: i32, value: Option<f64>) -> RawRecord {
        RawRecord {
            entity: EntityCode::from(code),
            name: format!("{code} name"),
            region: region.map(str::to_string),
            indicator,
            year,
            value,
        }
    }

    #[test]
    fn groups_rows_into_sorted_series() {
        let store = TimeSeriesStore::load(vec![
            rec("FR", Some("Europe"), Indicator::LifeExpectancy, 2010, Some(81.0)),
            rec("FR", Some("Europe"), Indicator::LifeExpectancy, 2000, Some(79.0)),
            rec("FR", Some("Europe"), Indicator::Population, 2000, Some(60e6)),
            rec("KE", Some("Africa"), Indicator::LifeExpectancy, 2005, Some(55.0)),
        ]);

        let fr = EntityCode::from("FR");
        let life = store.series_for(&fr, Indicator::LifeExpectancy);
        assert_eq!(
            life.samples(),
            &[Sample::new(2000, 79.0), Sample::new(2010, 81.0)]
        );
        assert_eq!(store.series_for(&fr, Indicator::Population).len(), 1);
        assert_eq!(store.entities().count(), 2);
        assert_eq!(store.observed_span(), Some(YearRange::new(2000, 2010)));
    }

    #[test]
    fn duplicate_rows_are_last_write_wins() {
        let store = TimeSeriesStore::load(vec![
            rec("FR", None, Indicator::LifeExpectancy, 2000, Some(79.0)),
            rec("FR", None, Indicator::LifeExpectancy, 2000, Some(80.5)),
        ]);
        let series = store.series_for(&EntityCode::from("FR"), Indicator::LifeExpectancy);
        assert_eq!(series.samples(), &[Sample::new(2000, 80.5)]);
    }

    #[test]
    fn later_row_without_value_clears_the_year() {
        let store = TimeSeriesStore::load(vec![
            rec("FR", None, Indicator::LifeExpectancy, 1999, Some(78.6)),
            rec("FR", None, Indicator::LifeExpectancy, 2000, Some(79.0)),
            rec("FR", None, Indicator::LifeExpectancy, 2000, None),
        ]);
        let series = store.series_for(&EntityCode::from("FR"), Indicator::LifeExpectancy);
        assert_eq!(series.samples(), &[Sample::new(1999, 78.6)]);

        // And a value after an absent row restores the year.
        let store = TimeSeriesStore::load(vec![
            rec("FR", None, Indicator::LifeExpectancy, 2000, None),
            rec("FR", None, Indicator::LifeExpectancy, 2000, Some(79.0)),
        ]);
        let series = store.series_for(&EntityCode::from("FR"), Indicator::LifeExpectancy);
        assert_eq!(series.samples(), &[Sample::new(2000, 79.0)]);
    }

    #[test]
    fn missing_series_is_empty_not_an_error() {
        let store = TimeSeriesStore::load(vec![rec(
            "FR",
            None,
            Indicator::LifeExpectancy,
            2000,
            None,
        )]);
        let fr = EntityCode::from("FR");
        assert!(store.series_for(&fr, Indicator::LifeExpectancy).is_empty());
        assert!(store.series_for(&EntityCode::from("ZZ"), Indicator::Population).is_empty());
        // The entity is still known even though it has no samples.
        assert!(store.entity(&fr).is_some());
        assert_eq!(store.observed_span(), None);
    }

    #[test]
    fn first_non_empty_region_wins() {
        let store = TimeSeriesStore::load(vec![
            rec("FR", Some(""), Indicator::LifeExpectancy, 1999, Some(78.0)),
            rec("FR", Some("Europe"), Indicator::LifeExpectancy, 2000, Some(79.0)),
            rec("FR", Some("Elsewhere"), Indicator::LifeExpectancy, 2001, Some(79.2)),
        ]);
        let fr = store.entity(&EntityCode::from("FR")).unwrap();
        assert_eq!(fr.region.as_deref(), Some("Europe"));
    }
}
