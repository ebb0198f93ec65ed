/// Chart view models.
///
/// Each view owns the last payload applied to it and everything needed to
/// draw it, but never interpolates and never touches the year filter. The
/// egui drawing code lives in `crate::ui::plot`.

pub mod bar;
pub mod bubble;
pub mod choropleth;
pub mod line;

use std::fmt;
use std::time::{Duration, Instant};

use crate::api::FetchError;
use crate::data::filter::EffectiveRange;

use bar::{BarData, BarView};
use bubble::{BubbleData, BubbleView};
use choropleth::{ChoroplethData, ChoroplethView};
use line::{LineData, LineView};

// ---------------------------------------------------------------------------
// ChartKind – registration order is refresh order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Choropleth,
    ScatterBubble,
    Bar,
    Line,
}

impl ChartKind {
    /// Refresh order: later charts may assume earlier ones are done.
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Choropleth,
        ChartKind::ScatterBubble,
        ChartKind::Bar,
        ChartKind::Line,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::Choropleth => "Average life expectancy",
            ChartKind::ScatterBubble => "Health expenditure vs. life expectancy",
            ChartKind::Bar => "Causes of death",
            ChartKind::Line => "Life expectancy over time",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Data fetched for one chart.
#[derive(Debug, Clone)]
pub enum ChartPayload {
    Choropleth(ChoroplethData),
    Bubble(BubbleData),
    Bar(BarData),
    Line(LineData),
}

impl ChartPayload {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartPayload::Choropleth(_) => ChartKind::Choropleth,
            ChartPayload::Bubble(_) => ChartKind::ScatterBubble,
            ChartPayload::Bar(_) => ChartKind::Bar,
            ChartPayload::Line(_) => ChartKind::Line,
        }
    }
}

// ---------------------------------------------------------------------------
// Hover capability
// ---------------------------------------------------------------------------

/// Pointer interaction, in the chart's own plot coordinates.
pub trait HoverSink {
    fn on_hover(&mut self, point: [f64; 2]);
    fn on_leave(&mut self);
}

// ---------------------------------------------------------------------------
// Per-view content state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ViewState<T> {
    Waiting,
    Ready {
        range: EffectiveRange,
        data: T,
    },
    NoData(EffectiveRange),
    Failed {
        range: EffectiveRange,
        message: String,
    },
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        ViewState::Waiting
    }
}

impl<T> ViewState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Ready { data, .. } => Some(data),
            _ => None,
        }
    }

    /// The years the current content was fetched for.
    pub fn range(&self) -> Option<EffectiveRange> {
        match self {
            ViewState::Waiting => None,
            ViewState::Ready { range, .. }
            | ViewState::NoData(range)
            | ViewState::Failed { range, .. } => Some(*range),
        }
    }

    /// Text to show instead of the chart, if it cannot be drawn.
    pub fn placeholder(&self) -> Option<String> {
        match self {
            ViewState::Ready { .. } => None,
            ViewState::Waiting => Some("Loading…".to_string()),
            ViewState::NoData(range) => Some(format!("No data available for years {range}")),
            ViewState::Failed { range, .. } => {
                Some(format!("Could not load data for years {range}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ChartBoard – the set of registered renderers
// ---------------------------------------------------------------------------

pub struct ChartBoard {
    pub choropleth: ChoroplethView,
    pub bubble: BubbleView,
    pub bar: BarView,
    pub line: LineView,
}

impl ChartBoard {
    pub fn new(frame_interval: Duration) -> Self {
        ChartBoard {
            choropleth: ChoroplethView::default(),
            bubble: BubbleView::new(frame_interval),
            bar: BarView::new(frame_interval),
            line: LineView::default(),
        }
    }

    /// Apply a fetch outcome to `chart` only. Failures are logged and turn
    /// into that chart's placeholder.
    pub fn apply(
        &mut self,
        chart: ChartKind,
        range: EffectiveRange,
        outcome: Result<ChartPayload, FetchError>,
        now: Instant,
    ) {
        let payload = match outcome {
            Ok(payload) if payload.kind() == chart => payload,
            Ok(payload) => {
                log::warn!("{chart}: received a {} payload; ignoring", payload.kind());
                return self.fail(chart, range, "unexpected payload".to_string());
            }
            Err(err) => {
                log::warn!("{chart}: fetch for {range} failed: {err}");
                return self.fail(chart, range, err.to_string());
            }
        };

        match payload {
            ChartPayload::Choropleth(data) => self.choropleth.load(range, data),
            ChartPayload::Bubble(data) => self.bubble.load(range, data, now),
            ChartPayload::Bar(data) => self.bar.load(range, data, now),
            ChartPayload::Line(data) => self.line.load(range, data),
        }
    }

    fn fail(&mut self, chart: ChartKind, range: EffectiveRange, message: String) {
        match chart {
            ChartKind::Choropleth => self.choropleth.set_state(ViewState::Failed { range, message }),
            ChartKind::ScatterBubble => self.bubble.set_state(ViewState::Failed { range, message }),
            ChartKind::Bar => self.bar.set_state(ViewState::Failed { range, message }),
            ChartKind::Line => self.line.set_state(ViewState::Failed { range, message }),
        }
    }

    /// Advance the animated charts.
    pub fn tick(&mut self, now: Instant) {
        self.bubble.tick(now);
        self.bar.tick(now);
    }

    /// When the next animation step is due.
    pub fn next_due(&self) -> Option<Instant> {
        [self.bubble.next_due(), self.bar.next_due()]
            .into_iter()
            .flatten()
            .min()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::filter::YearRange;

    #[test]
    fn failure_only_touches_its_chart() {
        let mut board = ChartBoard::new(Duration::from_secs(1));
        let range = YearRange::new(1960, 2023);
        let now = Instant::now();
        board.apply(ChartKind::Line, range, Ok(ChartPayload::Line(LineData::from_rows(Vec::new()))), now);
        board.apply(
            ChartKind::Bar,
            range,
            Err(FetchError::Transport {
                url: "http://127.0.0.1:8000/bar-chart-data/1960/2023".into(),
                message: "connection refused".into(),
            }),
            now,
        );

        assert!(matches!(board.bar.state(), ViewState::Failed { .. }));
        assert!(matches!(board.line.state(), ViewState::NoData(_)));
        assert!(matches!(board.bubble.state(), ViewState::Waiting));
        assert_eq!(
            board.bar.state().placeholder().as_deref(),
            Some("Could not load data for years 1960-2023")
        );
    }

    #[test]
    fn mismatched_payload_is_a_failure() {
        let mut board = ChartBoard::new(Duration::from_secs(1));
        let range = YearRange::new(2000, 2010);
        let payload = ChartPayload::Bar(BarData::from_rows(Vec::new()));
        board.apply(ChartKind::Line, range, Ok(payload), Instant::now());
        assert!(matches!(board.line.state(), ViewState::Failed { .. }));
    }

    #[test]
    fn no_data_placeholder_names_the_range() {
        let state: ViewState<()> = ViewState::NoData(YearRange::new(1960, 1990));
        assert_eq!(
            state.placeholder().as_deref(),
            Some("No data available for years 1960-1990")
        );
    }

    #[test]
    fn next_due_is_earliest_animation() {
        let mut board = ChartBoard::new(Duration::from_secs(1));
        assert_eq!(board.next_due(), None);
        let now = Instant::now();
        let bubble = BubbleData::new(BTreeMap::new());
        board.apply(ChartKind::ScatterBubble, YearRange::new(2000, 2001), Ok(ChartPayload::Bubble(bubble)), now);
        // No frames with data, so nothing is scheduled.
        assert_eq!(board.next_due(), None);
    }
}
