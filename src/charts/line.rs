use std::collections::BTreeMap;

use super::{HoverSink, ViewState};
use crate::api::wire::LineRow;
use crate::data::filter::EffectiveRange;

/// Life expectancy per country, as `[year, value]` points sorted by year.
#[derive(Debug, Clone, Default)]
pub struct LineData {
    series: BTreeMap<String, Vec<[f64; 2]>>,
    x_extent: Option<(f64, f64)>,
    y_max: f64,
}

/// The point closest to the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct LineHover {
    pub country: String,
    pub year: i32,
    pub value: f64,
}

impl LineHover {
    pub fn label(&self) -> String {
        format!("{}: {:.2}", self.country, self.value)
    }
}

impl LineData {
    pub fn from_rows(rows: Vec<LineRow>) -> Self {
        let mut series: BTreeMap<String, Vec<[f64; 2]>> = BTreeMap::new();
        for row in rows {
            let Some(value) = row.value.filter(|v| v.is_finite()) else {
                continue;
            };
            series
                .entry(row.name)
                .or_default()
                .push([f64::from(row.date), value]);
        }
        for points in series.values_mut() {
            points.sort_by(|a, b| a[0].total_cmp(&b[0]));
        }

        let all = || series.values().flatten();
        let x_extent = all().fold(None, |acc: Option<(f64, f64)>, p| match acc {
            None => Some((p[0], p[0])),
            Some((lo, hi)) => Some((lo.min(p[0]), hi.max(p[0]))),
        });
        let y_max = all().map(|p| p[1]).fold(0.0, f64::max);

        LineData {
            series,
            x_extent,
            y_max,
        }
    }

    pub fn series(&self) -> impl Iterator<Item = (&str, &[[f64; 2]])> {
        self.series.iter().map(|(name, pts)| (name.as_str(), pts.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Nearest point, measured with both axes scaled to unit length
    /// (x over the year extent, y over `[0, max]`).
    pub fn nearest(&self, [px, py]: [f64; 2]) -> Option<LineHover> {
        let (x0, x1) = self.x_extent?;
        let sx = (x1 - x0).max(1.0);
        let sy = self.y_max.max(f64::EPSILON);
        self.series
            .iter()
            .flat_map(|(name, pts)| pts.iter().map(move |p| (name, p)))
            .map(|(name, p)| (name, p, ((p[0] - px) / sx).hypot((p[1] - py) / sy)))
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(name, p, _)| LineHover {
                country: name.clone(),
                year: p[0] as i32,
                value: p[1],
            })
    }
}

// ---------------------------------------------------------------------------
// LineView
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct LineView {
    state: ViewState<LineData>,
    hovered: Option<LineHover>,
}

impl LineView {
    pub fn state(&self) -> &ViewState<LineData> {
        &self.state
    }

    pub fn set_state(&mut self, state: ViewState<LineData>) {
        self.hovered = None;
        self.state = state;
    }

    pub fn load(&mut self, range: EffectiveRange, data: LineData) {
        if data.is_empty() {
            self.set_state(ViewState::NoData(range));
        } else {
            self.set_state(ViewState::Ready { range, data });
        }
    }

    pub fn hovered(&self) -> Option<&LineHover> {
        self.hovered.as_ref()
    }

    /// Whether `country` should be drawn emphasised.
    pub fn is_highlighted(&self, country: &str) -> bool {
        self.hovered.as_ref().is_some_and(|h| h.country == country)
    }
}

impl HoverSink for LineView {
    fn on_hover(&mut self, point: [f64; 2]) {
        self.hovered = self.state.data().and_then(|d| d.nearest(point));
    }

    fn on_leave(&mut self) {
        self.hovered = None;
    }
}
