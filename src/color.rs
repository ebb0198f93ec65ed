use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    hue_palette(n, 0.0, 0.55)
}

/// `n` evenly spaced hues starting `offset` of a step past red.
fn hue_palette(n: usize, offset: f32, lightness: f32) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = ((i as f32 + offset) / n as f32) * 360.0;
            to_color32(Hsl::new(hue, 0.75, lightness))
        })
        .collect()
}

fn to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

fn to_hsl(hex: u32) -> Hsl {
    let rgb: Srgb = Srgb::<u8>::from(hex).into_format();
    rgb.into_color()
}

// ---------------------------------------------------------------------------
// Categorical mapping: region → Color32
// ---------------------------------------------------------------------------

/// Regions listed in the bubble chart legend, in legend order.
pub const LEGEND_REGIONS: [&str; 5] = ["Africa", "Americas", "Europe", "Asia", "Oceania"];

/// Maps categories (regions) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map. Legend regions always get the same five hues;
    /// any other region seen in the data is coloured from a darker palette
    /// placed between them.
    pub fn new<'a>(extra: impl IntoIterator<Item = &'a str>) -> Self {
        let mut mapping: BTreeMap<String, Color32> = LEGEND_REGIONS
            .iter()
            .map(|r| r.to_string())
            .zip(generate_palette(LEGEND_REGIONS.len()))
            .collect();

        let mut others: Vec<&str> = Vec::new();
        for region in extra {
            if !mapping.contains_key(region) && !others.contains(&region) {
                others.push(region);
            }
        }
        let palette = hue_palette(others.len(), 0.5, 0.35);
        mapping.extend(others.into_iter().map(str::to_string).zip(palette));

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a region; unknown or missing regions are grey.
    pub fn color_for(&self, region: Option<&str>) -> Color32 {
        region
            .and_then(|r| self.mapping.get(r))
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (label → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(&'static str, Color32)> {
        LEGEND_REGIONS
            .iter()
            .map(|&r| (r, self.color_for(Some(r))))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Cause-of-death colours
// ---------------------------------------------------------------------------

/// Fixed fill for the bar chart categories.
pub fn cause_color(name: &str) -> Color32 {
    match name {
        "Communicable Diseases" => Color32::from_rgb(0xb3, 0xde, 0xe2),
        "Injuries" => Color32::from_rgb(0xc8, 0xb6, 0xff),
        "Non-communicable Diseases" => Color32::from_rgb(0xff, 0xaf, 0xcc),
        _ => Color32::LIGHT_GRAY,
    }
}

// ---------------------------------------------------------------------------
// Sequential scale for the choropleth
// ---------------------------------------------------------------------------

/// Fill for countries without data.
pub const NO_DATA_COLOR: Color32 = Color32::from_rgb(0x95, 0x95, 0x95);

/// Maps `[min, max]` onto an HSL ramp from red (low) to green (high).
#[derive(Debug, Clone, Copy)]
pub struct SequentialScale {
    min: f64,
    max: f64,
    low: Hsl,
    high: Hsl,
}

impl SequentialScale {
    /// Scale over the extent of `values`; `None` when there are no finite values.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        Some(SequentialScale {
            min,
            max,
            low: to_hsl(0xf9035e),
            high: to_hsl(0x5fc52e),
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn color_at(&self, value: f64) -> Color32 {
        let span = self.max - self.min;
        let t = if span.abs() < f64::EPSILON {
            0.5
        } else {
            ((value - self.min) / span).clamp(0.0, 1.0)
        };
        to_color32(self.low.mix(self.high, t as f32))
    }
}
