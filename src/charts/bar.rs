use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::ViewState;
use crate::animation::{AnimationSchedule, Tick};
use crate::api::wire::CauseRow;
use crate::data::filter::EffectiveRange;

/// One bar: a cause of death and its share of all deaths, in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct BarEntry {
    pub name: String,
    pub value: f64,
}

/// Cause-of-death shares grouped by year, each year sorted descending.
#[derive(Debug, Clone, Default)]
pub struct BarData {
    by_year: BTreeMap<i32, Vec<BarEntry>>,
    max_value: f64,
}

impl BarData {
    /// Bars shown per year.
    pub const TOP: usize = 3;

    pub fn from_rows(rows: Vec<CauseRow>) -> Self {
        let mut by_year: BTreeMap<i32, Vec<BarEntry>> = BTreeMap::new();
        for row in rows.into_iter().filter(|r| r.value.is_finite()) {
            by_year.entry(row.date).or_default().push(BarEntry {
                name: row.name,
                value: row.value,
            });
        }
        for entries in by_year.values_mut() {
            entries.sort_by(|a, b| b.value.total_cmp(&a.value));
            entries.truncate(Self::TOP);
        }
        let max_value = by_year
            .values()
            .flatten()
            .map(|e| e.value)
            .fold(0.0, f64::max);
        BarData { by_year, max_value }
    }

    pub fn year(&self, year: i32) -> &[BarEntry] {
        self.by_year.get(&year).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn years(&self) -> Vec<i32> {
        self.by_year.keys().copied().collect()
    }

    /// Largest share across all years; keeps the value axis fixed while animating.
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn is_empty(&self) -> bool {
        self.by_year.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BarView
// ---------------------------------------------------------------------------

pub struct BarView {
    state: ViewState<BarData>,
    schedule: AnimationSchedule,
    year: Option<i32>,
}

impl BarView {
    pub fn new(frame_interval: Duration) -> Self {
        BarView {
            state: ViewState::Waiting,
            schedule: AnimationSchedule::new(frame_interval),
            year: None,
        }
    }

    pub fn state(&self) -> &ViewState<BarData> {
        &self.state
    }

    pub fn set_state(&mut self, state: ViewState<BarData>) {
        self.schedule.cancel();
        self.year = None;
        self.state = state;
    }

    pub fn load(&mut self, range: EffectiveRange, data: BarData, now: Instant) {
        if data.is_empty() {
            self.set_state(ViewState::NoData(range));
            return;
        }
        let years = data.years();
        self.set_state(ViewState::Ready { range, data });
        self.schedule.restart(years, now);
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(tick) = self.schedule.poll(now) {
            self.apply_tick(tick);
        }
    }

    pub fn apply_tick(&mut self, tick: Tick) -> bool {
        if !self.schedule.is_current(tick.handle) {
            return false;
        }
        self.year = Some(tick.year);
        true
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.schedule.next_due()
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// Bars for the year currently shown.
    pub fn current(&self) -> &[BarEntry] {
        match (self.state.data(), self.year) {
            (Some(data), Some(year)) => data.year(year),
            _ => &[],
        }
    }
}
