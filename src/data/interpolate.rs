use std::collections::HashMap;

use super::model::{EntityCode, Indicator, Series};
use super::store::TimeSeriesStore;

// ---------------------------------------------------------------------------
// Linear interpolation inside the observed span
// ---------------------------------------------------------------------------

/// Value of `series` at `year`.
///
/// * exact sample → its value
/// * strictly between two samples → linear interpolation of the neighbours
/// * before the first or after the last sample → `None`; the series is
///   never extrapolated
pub fn value_at(series: &Series, year: i32) -> Option<f64> {
    let samples = series.samples();
    // Index of the first sample with sample.year >= year.
    let idx = samples.partition_point(|s| s.year < year);

    if let Some(hit) = samples.get(idx).filter(|s| s.year == year) {
        return Some(hit.value);
    }

    let before = samples.get(idx.checked_sub(1)?)?;
    let after = samples.get(idx)?;

    let fraction = f64::from(year - before.year) / f64::from(after.year - before.year);
    Some(before.value + fraction * (after.value - before.value))
}

// ---------------------------------------------------------------------------
// Per-run memoisation
// ---------------------------------------------------------------------------

/// Memoises [`value_at`] lookups against one store for the length of an
/// animation run. Drop it whenever the store is rebuilt.
pub struct InterpolationCache<'a> {
    store: &'a TimeSeriesStore,
    values: HashMap<(EntityCode, Indicator, i32), Option<f64>>,
}

impl<'a> InterpolationCache<'a> {
    pub fn new(store: &'a TimeSeriesStore) -> Self {
        InterpolationCache {
            store,
            values: HashMap::new(),
        }
    }

    pub fn store(&self) -> &'a TimeSeriesStore {
        self.store
    }

    pub fn value_at(&mut self, entity: &EntityCode, indicator: Indicator, year: i32) -> Option<f64> {
        let store = self.store;
        *self
            .values
            .entry((entity.clone(), indicator, year))
            .or_insert_with(|| value_at(store.series_for(entity, indicator), year))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data::model::{RawRecord, Sample};

    fn series(points: &[(i32, f64)]) -> Series {
        Series::from_samples(points.iter().map(|&(y, v)| Sample::new(y, v)))
    }

    #[test]
    fn interpolates_between_neighbours() {
        let s = series(&[(2000, 10.0), (2010, 20.0)]);
        assert_relative_eq!(value_at(&s, 2005).unwrap(), 15.0);
        assert_relative_eq!(value_at(&s, 2001).unwrap(), 11.0);
    }

    #[test]
    fn exact_match_returns_sample() {
        let s = series(&[(2000, 10.0), (2010, 20.0)]);
        assert_eq!(value_at(&s, 2010), Some(20.0));
        assert_eq!(value_at(&s, 2000), Some(10.0));
    }

    #[test]
    fn never_extrapolates() {
        let s = series(&[(2000, 10.0), (2010, 20.0)]);
        assert_eq!(value_at(&s, 1999), None);
        assert_eq!(value_at(&s, 2011), None);
        assert_eq!(value_at(&s, 1960), None);
    }

    #[test]
    fn single_sample_only_matches_its_year() {
        let s = series(&[(2004, 7.5)]);
        assert_eq!(value_at(&s, 2004), Some(7.5));
        assert_eq!(value_at(&s, 2003), None);
        assert_eq!(value_at(&s, 2005), None);
        assert_eq!(value_at(&Series::EMPTY, 2004), None);
    }

    #[test]
    fn interpolated_values_stay_between_neighbours() {
        let s = series(&[
            (1960, 45.0),
            (1967, 52.5),
            (1971, 50.0),
            (1990, 68.25),
            (2003, 68.25),
            (2020, 74.0),
        ]);
        let pairs: Vec<_> = s.samples().windows(2).map(|w| (w[0], w[1])).collect();
        for year in 1961..2020 {
            let value = value_at(&s, year).expect("inside span");
            let (lo, hi) = pairs
                .iter()
                .find(|(a, b)| a.year <= year && year <= b.year)
                .map(|(a, b)| (a.value.min(b.value), a.value.max(b.value)))
                .unwrap();
            assert!(
                lo <= value && value <= hi,
                "{year}: {value} outside [{lo}, {hi}]"
            );
        }
    }

    #[test]
    fn cache_memoises_per_key() {
        let store = TimeSeriesStore::load(vec![
            RawRecord {
                entity: EntityCode::from("FR"),
                name: "France".into(),
                region: None,
                indicator: Indicator::LifeExpectancy,
                year: 2000,
                value: Some(79.0),
            },
            RawRecord {
                entity: EntityCode::from("FR"),
                name: "France".into(),
                region: None,
                indicator: Indicator::LifeExpectancy,
                year: 2002,
                value: Some(80.0),
            },
        ]);
        let fr = EntityCode::from("FR");
        let mut cache = InterpolationCache::new(&store);
        assert_relative_eq!(cache.value_at(&fr, Indicator::LifeExpectancy, 2001).unwrap(), 79.5);
        assert_relative_eq!(cache.value_at(&fr, Indicator::LifeExpectancy, 2001).unwrap(), 79.5);
        assert_eq!(cache.value_at(&fr, Indicator::Population, 2001), None);
        assert_eq!(cache.len(), 2);
    }
}
