use std::collections::BTreeMap;

use super::filter::YearRange;
use super::interpolate::InterpolationCache;
use super::model::{EntityCode, Frame, FramePoint, Indicator};
use super::store::TimeSeriesStore;

// ---------------------------------------------------------------------------
// Frame assembly
// ---------------------------------------------------------------------------

/// One frame per year of `range`, all entities of the store, sharing one
/// interpolation cache.
pub fn build_frames(store: &TimeSeriesStore, range: YearRange) -> BTreeMap<i32, Frame> {
    let codes = store.entity_codes();
    let mut cache = InterpolationCache::new(store);
    range
        .years()
        .map(|year| (year, build_frame(&mut cache, &codes, year)))
        .collect()
}

/// Build the snapshot for `year` over the given entities of the cache's
/// store.
///
/// An entity is kept only when health expenditure is available and strictly
/// positive and both life expectancy and population are available.
/// Non-positive health expenditure is treated as missing data, not zero.
pub fn build_frame<'e>(
    cache: &mut InterpolationCache<'_>,
    entities: impl IntoIterator<Item = &'e EntityCode>,
    year: i32,
) -> Frame {
    let store = cache.store();
    let mut points = BTreeMap::new();

    for code in entities {
        let Some(entity) = store.entity(code) else {
            continue;
        };

        let health_exp = cache.value_at(code, Indicator::HealthExpenditure, year);
        let life_exp = cache.value_at(code, Indicator::LifeExpectancy, year);
        let population = cache.value_at(code, Indicator::Population, year);

        let (Some(health_exp), Some(life_exp), Some(population)) = (health_exp, life_exp, population)
        else {
            continue;
        };
        if health_exp <= 0.0 {
            continue;
        }

        points.insert(
            code.clone(),
            FramePoint {
                name: entity.name.clone(),
                region: entity.region.clone(),
                health_exp,
                life_exp,
                population,
            },
        );
    }

    Frame { year, points }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data::model::RawRecord;

    fn rec(code: &str, indicator: Indicator, year: i32, value: f64) -> RawRecord {
        RawRecord {
            entity: EntityCode::from(code),
            name: code.to_lowercase(),
            region: Some("Europe".into()),
            indicator,
            year,
            value: Some(value),
        }
    }

    fn full(code: &str, year: i32, health: f64, life: f64, pop: f64) -> Vec<RawRecord> {
        vec![
            rec(code, Indicator::HealthExpenditure, year, health),
            rec(code, Indicator::LifeExpectancy, year, life),
            rec(code, Indicator::Population, year, pop),
        ]
    }

    #[test]
    fn joins_exact_and_interpolated_values() {
        let mut rows = full("FR", 2000, 10.0, 79.0, 60.0e6);
        rows.extend(full("FR", 2010, 12.0, 81.0, 64.0e6));
        let store = TimeSeriesStore::load(rows);

        let frame = build_frame(&mut InterpolationCache::new(&store), &store.entity_codes(), 2005);
        let fr = &frame.points[&EntityCode::from("FR")];
        assert_eq!(frame.year, 2005);
        assert_relative_eq!(fr.health_exp, 11.0);
        assert_relative_eq!(fr.life_exp, 80.0);
        assert_relative_eq!(fr.population, 62.0e6);
        assert_eq!(fr.region.as_deref(), Some("Europe"));
        assert_eq!(fr.name, "fr");
    }

    #[test]
    fn zero_health_expenditure_excludes_entity() {
        let mut rows = full("FR", 2000, 0.0, 79.0, 60.0e6);
        rows.extend(full("DE", 2000, 9.5, 78.0, 82.0e6));
        let store = TimeSeriesStore::load(rows);

        let frame = build_frame(&mut InterpolationCache::new(&store), &store.entity_codes(), 2000);
        assert_eq!(frame.len(), 1);
        assert!(frame.points.contains_key(&EntityCode::from("DE")));
    }

    #[test]
    fn missing_indicator_excludes_entity() {
        let store = TimeSeriesStore::load(vec![
            rec("FR", Indicator::HealthExpenditure, 2000, 10.0),
            rec("FR", Indicator::LifeExpectancy, 2000, 79.0),
        ]);
        assert!(build_frame(&mut InterpolationCache::new(&store), &store.entity_codes(), 2000).is_empty());
    }

    #[test]
    fn unknown_entities_are_ignored() {
        let store = TimeSeriesStore::load(full("FR", 2000, 10.0, 79.0, 60.0e6));
        let frame = build_frame(&mut InterpolationCache::new(&store), &[EntityCode::from("ZZ")], 2000);
        assert!(frame.is_empty());
    }

    #[test]
    fn frames_cover_every_year_of_the_range() {
        let mut rows = full("FR", 2000, 10.0, 79.0, 60.0e6);
        rows.extend(full("FR", 2002, 12.0, 81.0, 64.0e6));
        let store = TimeSeriesStore::load(rows);

        let frames = build_frames(&store, YearRange::new(1999, 2003));
        assert_eq!(frames.keys().copied().collect::<Vec<_>>(), vec![1999, 2000, 2001, 2002, 2003]);
        assert!(frames[&1999].is_empty());
        assert_eq!(frames[&2001].len(), 1);
        assert!(frames[&2003].is_empty());
    }
}
