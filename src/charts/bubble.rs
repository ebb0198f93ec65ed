use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::{HoverSink, ViewState};
use crate::animation::{AnimationSchedule, Tick};
use crate::color::ColorMap;
use crate::data::filter::EffectiveRange;
use crate::data::model::{EntityCode, Frame, FramePoint};

/// Bubble radii in points, for population 0 and the largest population.
const MIN_RADIUS: f32 = 4.0;
const MAX_RADIUS: f32 = 17.0;

/// Pointer distance, as a fraction of the axis spans, that still counts as
/// hovering a bubble.
const HOVER_TOLERANCE: f64 = 0.04;

// ---------------------------------------------------------------------------
// BubbleData – pre-built frames for every year of the range
// ---------------------------------------------------------------------------

/// Axis domains shared by all frames so bubbles move on fixed axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleExtent {
    /// log10 of health expenditure.
    pub x: (f64, f64),
    /// Life expectancy.
    pub y: (f64, f64),
    pub max_population: f64,
}

#[derive(Debug, Clone)]
pub struct BubbleData {
    frames: BTreeMap<i32, Frame>,
    extent: Option<BubbleExtent>,
    colors: ColorMap,
}

impl BubbleData {
    pub fn new(frames: BTreeMap<i32, Frame>) -> Self {
        let points = || frames.values().flat_map(|f| f.points.values());
        let extent = extent_of(points());
        let colors = ColorMap::new(points().filter_map(|p| p.region.as_deref()));
        BubbleData {
            frames,
            extent,
            colors,
        }
    }

    pub fn frame(&self, year: i32) -> Option<&Frame> {
        self.frames.get(&year)
    }

    /// Years with at least one valid entity; the only years the animation visits.
    pub fn animated_years(&self) -> Vec<i32> {
        self.frames
            .iter()
            .filter(|(_, f)| !f.is_empty())
            .map(|(y, _)| *y)
            .collect()
    }

    pub fn extent(&self) -> Option<BubbleExtent> {
        self.extent
    }

    pub fn colors(&self) -> &ColorMap {
        &self.colors
    }

    /// Square-root scale so that bubble area tracks population.
    pub fn radius(&self, population: f64) -> f32 {
        let Some(max) = self.extent.map(|e| e.max_population).filter(|m| *m > 0.0) else {
            return MIN_RADIUS;
        };
        let t = (population.max(0.0) / max).sqrt().min(1.0) as f32;
        MIN_RADIUS + t * (MAX_RADIUS - MIN_RADIUS)
    }
}

fn extent_of<'a>(points: impl Iterator<Item = &'a FramePoint>) -> Option<BubbleExtent> {
    let mut acc: Option<(f64, f64, f64, f64, f64)> = None;
    for p in points {
        acc = Some(match acc {
            None => (p.health_exp, p.health_exp, p.life_exp, p.life_exp, p.population),
            Some((x0, x1, y0, y1, pop)) => (
                x0.min(p.health_exp),
                x1.max(p.health_exp),
                y0.min(p.life_exp),
                y1.max(p.life_exp),
                pop.max(p.population),
            ),
        });
    }
    let (x0, x1, y0, y1, max_population) = acc?;
    Some(BubbleExtent {
        x: ((x0 * 0.8).max(0.1).log10(), (x1 * 1.2).log10()),
        y: (y0 * 0.95, y1 * 1.02),
        max_population,
    })
}

/// Plot coordinates of a bubble: log10 health expenditure, life expectancy.
pub fn plot_position(point: &FramePoint) -> [f64; 2] {
    [point.health_exp.log10(), point.life_exp]
}

/// Multi-line tooltip for one bubble.
pub fn describe(point: &FramePoint) -> String {
    format!(
        "{}\nRegion: {}\nHealth Exp: {:.2}%\nLife Exp: {:.1} years\nPopulation: {}",
        point.name,
        point.region.as_deref().unwrap_or("Unknown"),
        point.health_exp,
        point.life_exp,
        format_si(point.population),
    )
}

/// Two significant digits with an SI suffix: 1234567 → "1.2M".
pub fn format_si(value: f64) -> String {
    const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "G"), (1e6, "M"), (1e3, "k")];
    let (scaled, suffix) = SUFFIXES
        .iter()
        .find(|(scale, _)| value.abs() >= *scale)
        .map(|(scale, s)| (value / scale, *s))
        .unwrap_or((value, ""));
    let digits = if scaled.abs() >= 10.0 { 0 } else { 1 };
    format!("{scaled:.digits$}{suffix}")
}

// ---------------------------------------------------------------------------
// BubbleView
// ---------------------------------------------------------------------------

pub struct BubbleView {
    state: ViewState<BubbleData>,
    schedule: AnimationSchedule,
    year: Option<i32>,
    hovered: Option<EntityCode>,
}

impl BubbleView {
    pub fn new(frame_interval: Duration) -> Self {
        BubbleView {
            state: ViewState::Waiting,
            schedule: AnimationSchedule::new(frame_interval),
            year: None,
            hovered: None,
        }
    }

    pub fn state(&self) -> &ViewState<BubbleData> {
        &self.state
    }

    /// Replace the content. The running animation is torn down first.
    pub fn set_state(&mut self, state: ViewState<BubbleData>) {
        self.schedule.cancel();
        self.year = None;
        self.hovered = None;
        self.state = state;
    }

    pub fn load(&mut self, range: EffectiveRange, data: BubbleData, now: Instant) {
        let years = data.animated_years();
        if years.is_empty() {
            self.set_state(ViewState::NoData(range));
            return;
        }
        log::debug!("bubble chart: {} animated years in {range}", years.len());
        self.set_state(ViewState::Ready { range, data });
        self.schedule.restart(years, now);
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(tick) = self.schedule.poll(now) {
            self.apply_tick(tick);
        }
    }

    /// Show the tick's year, unless the tick belongs to a torn-down run.
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

    #[cfg(test)]
    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.state.data()?.frame(self.year?)
    }

    pub fn hovered(&self) -> Option<&FramePoint> {
        self.current_frame()?.points.get(self.hovered.as_ref()?)
    }

    fn nearest(&self, [px, py]: [f64; 2]) -> Option<EntityCode> {
        let extent = self.state.data()?.extent()?;
        let sx = (extent.x.1 - extent.x.0).max(f64::EPSILON);
        let sy = (extent.y.1 - extent.y.0).max(f64::EPSILON);
        self.current_frame()?
            .points
            .iter()
            .map(|(code, p)| {
                let [x, y] = plot_position(p);
                (code, ((x - px) / sx).hypot((y - py) / sy))
            })
            .filter(|(_, d)| *d <= HOVER_TOLERANCE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(code, _)| code.clone())
    }
}

impl HoverSink for BubbleView {
    fn on_hover(&mut self, point: [f64; 2]) {
        self.hovered = self.nearest(point);
    }

    fn on_leave(&mut self) {
        self.hovered = None;
    }
}
