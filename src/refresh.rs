//! Refresh coordination for the charts sharing one [`FilterState`].
//!
//! The coordinator performs no I/O. Every trigger returns the fetch the
//! caller should dispatch (if any), and every finished fetch is reported
//! back through [`FilterCoordinator::complete`], which decides whether the
//! result may be applied and what to fetch next.
//!
//! ```text
//!   Idle ──trigger──▶ Refreshing(pass, step) ──last chart done──▶ Idle
//!                        │    ▲                                  │
//!                 trigger│    └──── pending pass (coalesced) ◀───┘
//!                        ▼
//!                    pending = true
//! ```

use crate::charts::ChartKind;
use crate::data::filter::{EffectiveRange, FilterState};

/// Identifies one fetch of one refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub pass: u64,
    pub step: usize,
}

/// A fetch the caller must execute for `chart` over `range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub chart: ChartKind,
    pub range: EffectiveRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Refreshing { pass: u64, step: usize, range: EffectiveRange },
}

/// What to do with a finished fetch.
#[derive(Debug, PartialEq)]
pub enum Disposition<T> {
    /// Hand the outcome to this chart only.
    Apply {
        chart: ChartKind,
        range: EffectiveRange,
        outcome: T,
    },
    /// Stale or unknown; drop without touching any chart.
    Discard,
}

#[derive(Debug, PartialEq)]
pub struct Completion<T> {
    pub disposition: Disposition<T>,
    pub next: Option<FetchRequest>,
}

// ---------------------------------------------------------------------------
// FilterCoordinator
// ---------------------------------------------------------------------------

/// Owns the year selection and serializes chart refreshes.
///
/// * At most one pass is in flight; its charts are fetched one after the
///   other in registration order.
/// * Triggers arriving mid-pass are coalesced into a single follow-up pass
///   that reads the filter as it is when that pass starts.
/// * A result whose range no longer matches the current filter is
///   discarded and ends its pass early.
#[derive(Debug, Clone)]
pub struct FilterCoordinator {
    filter: FilterState,
    charts: Vec<ChartKind>,
    phase: Phase,
    pending: bool,
    passes_started: u64,
}

impl FilterCoordinator {
    pub fn new(filter: FilterState, charts: Vec<ChartKind>) -> Self {
        FilterCoordinator {
            filter,
            charts,
            phase: Phase::Idle,
            pending: false,
            passes_started: 0,
        }
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    #[cfg(test)]
    pub fn passes_started(&self) -> u64 {
        self.passes_started
    }

    /// Change the start year (clamping the end year) and refresh.
    pub fn set_start(&mut self, year: i32) -> Option<FetchRequest> {
        self.filter.set_start(year);
        self.refresh_all()
    }

    pub fn set_end(&mut self, year: i32) -> Option<FetchRequest> {
        self.filter.set_end(year);
        self.refresh_all()
    }

    /// The viewport changed size; every chart must be redrawn.
    pub fn on_resize(&mut self) -> Option<FetchRequest> {
        self.refresh_all()
    }

    /// Start a pass, or queue one if a pass is already running.
    pub fn refresh_all(&mut self) -> Option<FetchRequest> {
        match self.phase {
            Phase::Idle => self.start_pass(),
            Phase::Refreshing { pass, .. } => {
                log::debug!("refresh requested during pass {pass}; coalescing");
                self.pending = true;
                None
            }
        }
    }

    /// Drop the running pass, e.g. when its fetch could not be dispatched.
    /// A coalesced trigger goes with it; the next trigger starts afresh and
    /// late results of the dropped pass are discarded as unknown.
    pub fn abandon_pass(&mut self) {
        if let Phase::Refreshing { pass, .. } = self.phase {
            log::warn!("abandoning refresh pass {pass}");
        }
        self.phase = Phase::Idle;
        self.pending = false;
    }

    /// Report a finished fetch. Successful and failed outcomes are treated
    /// alike: both go to their chart only, so one chart's failure never
    /// stops its siblings from refreshing.
    pub fn complete<T>(&mut self, ticket: FetchTicket, outcome: T) -> Completion<T> {
        let Phase::Refreshing { pass, step, range } = self.phase else {
            return self.discard_unknown(ticket);
        };
        if ticket != (FetchTicket { pass, step }) {
            return self.discard_unknown(ticket);
        }

        if range != self.filter.effective_range() {
            log::debug!(
                "discarding stale response for {range} (filter is now {})",
                self.filter.effective_range()
            );
            self.phase = Phase::Idle;
            self.pending = false;
            return Completion {
                disposition: Disposition::Discard,
                next: self.start_pass(),
            };
        }

        let chart = self.charts[step];
        let next = if step + 1 < self.charts.len() {
            self.phase = Phase::Refreshing { pass, step: step + 1, range };
            Some(self.request(pass, step + 1, range))
        } else {
            log::debug!("refresh pass {pass} finished for {range}");
            self.phase = Phase::Idle;
            if std::mem::take(&mut self.pending) {
                self.start_pass()
            } else {
                None
            }
        };

        Completion {
            disposition: Disposition::Apply { chart, range, outcome },
            next,
        }
    }

    fn discard_unknown<T>(&self, ticket: FetchTicket) -> Completion<T> {
        log::debug!("ignoring response for unknown fetch {ticket:?}");
        Completion {
            disposition: Disposition::Discard,
            next: None,
        }
    }

    fn start_pass(&mut self) -> Option<FetchRequest> {
        if self.charts.is_empty() {
            return None;
        }
        self.passes_started += 1;
        let range = self.filter.effective_range();
        log::info!("refresh pass {} for {range}", self.passes_started);
        let pass = self.passes_started;
        self.phase = Phase::Refreshing { pass, step: 0, range };
        Some(self.request(pass, 0, range))
    }

    fn request(&self, pass: u64, step: usize, range: EffectiveRange) -> FetchRequest {
        FetchRequest {
            ticket: FetchTicket { pass, step },
            chart: self.charts[step],
            range,
        }
    }
}
