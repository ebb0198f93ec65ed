use std::collections::BTreeMap;
use std::sync::Arc;

use eframe::egui::Color32;

use super::{HoverSink, ViewState};
use crate::color::{NO_DATA_COLOR, SequentialScale};
use crate::data::filter::EffectiveRange;
use crate::data::topology::{CountryShape, WorldMap};

pub const LEGEND_TITLE: &str = "Average Life Expectancy (years)";

/// Colour ramp shown under the map: evenly spaced stops from the lowest to
/// the highest average.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleLegend {
    pub min_label: String,
    pub max_label: String,
    pub stops: Vec<Color32>,
}

/// Average life expectancy per country code, joined with the world shapes.
#[derive(Debug, Clone)]
pub struct ChoroplethData {
    averages: BTreeMap<String, f64>,
    map: Arc<WorldMap>,
    scale: Option<SequentialScale>,
}

impl ChoroplethData {
    pub fn new(averages: BTreeMap<String, f64>, map: Arc<WorldMap>) -> Self {
        let scale = SequentialScale::from_values(averages.values().copied());
        ChoroplethData {
            averages,
            map,
            scale,
        }
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    pub fn scale(&self) -> Option<&SequentialScale> {
        self.scale.as_ref()
    }

    /// Countries are matched on their `countryCode` property.
    pub fn value_for(&self, country: &CountryShape) -> Option<f64> {
        self.averages.get(country.code.as_deref()?).copied()
    }

    pub fn fill_for(&self, country: &CountryShape) -> Color32 {
        match (self.value_for(country), &self.scale) {
            (Some(v), Some(scale)) => scale.color_at(v),
            _ => NO_DATA_COLOR,
        }
    }

    /// No country has a value for the range.
    pub fn is_empty(&self) -> bool {
        self.averages.is_empty()
    }

    /// Legend for the fill scale; `None` without data.
    pub fn legend(&self, steps: usize) -> Option<ScaleLegend> {
        let scale = self.scale()?;
        let (min, max) = scale.domain();
        let steps = steps.max(2);
        let stops = (0..steps)
            .map(|i| {
                let value = if i + 1 == steps {
                    max
                } else {
                    min + (max - min) * i as f64 / (steps - 1) as f64
                };
                scale.color_at(value)
            })
            .collect();
        Some(ScaleLegend {
            min_label: format!("{min:.1}"),
            max_label: format!("{max:.1}"),
            stops,
        })
    }
}

// ---------------------------------------------------------------------------
// ChoroplethView
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ChoroplethView {
    state: ViewState<ChoroplethData>,
    hovered: Option<usize>,
}

impl ChoroplethView {
    pub fn state(&self) -> &ViewState<ChoroplethData> {
        &self.state
    }

    pub fn set_state(&mut self, state: ViewState<ChoroplethData>) {
        self.hovered = None;
        self.state = state;
    }

    /// An empty payload still shows the map, every country grey, with a
    /// notice instead of a legend.
    pub fn load(&mut self, range: EffectiveRange, data: ChoroplethData) {
        self.set_state(ViewState::Ready { range, data });
    }

    /// Message drawn with the map when no country has a value.
    pub fn notice(&self) -> Option<String> {
        let data = self.state.data()?;
        if !data.is_empty() {
            return None;
        }
        let range = self.state.range()?;
        Some(format!("No data available for years {range}"))
    }

    pub fn hovered(&self) -> Option<&CountryShape> {
        self.state.data()?.map().countries.get(self.hovered?)
    }

    /// Tooltip for the hovered country.
    pub fn hover_label(&self) -> Option<String> {
        let data = self.state.data()?;
        let country = self.hovered()?;
        let value = data
            .value_for(country)
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "Data not available".to_string());
        Some(format!("{}\nAverage Life Expectancy: {value}", country.name))
    }
}

impl HoverSink for ChoroplethView {
    fn on_hover(&mut self, point: [f64; 2]) {
        self.hovered = self.state.data().and_then(|d| d.map().country_at(point));
    }

    fn on_leave(&mut self) {
        self.hovered = None;
    }
}
