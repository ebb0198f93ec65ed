use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::http::HttpDataSource;
use crate::api::offline::DatabankSource;
use crate::api::{DataSource, TopologyCache};
use crate::charts::{ChartBoard, ChartKind};
use crate::config::AppConfig;
use crate::data::filter::FilterState;
use crate::refresh::{Disposition, FetchRequest, FilterCoordinator};
use crate::worker::FetchWorker;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering. Owned by the UI thread;
/// only the fetches themselves run elsewhere.
pub struct AppState {
    pub config: AppConfig,

    /// Year filter and refresh sequencing.
    coordinator: FilterCoordinator,

    /// The four chart views.
    pub charts: ChartBoard,

    /// Where chart data comes from.
    source: Arc<dyn DataSource>,

    worker: FetchWorker,

    resize: ResizeDebounce,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig, source: Arc<dyn DataSource>, worker: FetchWorker) -> Self {
        let coordinator = FilterCoordinator::new(FilterState::new(config.years), ChartKind::ALL.to_vec());
        Self {
            charts: ChartBoard::new(config.frame_interval),
            resize: ResizeDebounce::new(config.resize_debounce),
            coordinator,
            source,
            worker,
            status_message: None,
            config,
        }
    }

    /// State for `config`: the configured databank if there is one and it
    /// loads, the HTTP API otherwise.
    pub fn from_config(config: AppConfig, worker: FetchWorker) -> Self {
        let http = || -> Arc<dyn DataSource> { Arc::new(http_source(&config)) };
        let mut status = None;
        let source = match &config.databank_path {
            Some(path) => match DatabankSource::open(path, TopologyCache::new(&config.topology_path)) {
                Ok(source) => Arc::new(source) as Arc<dyn DataSource>,
                Err(e) => {
                    log::error!("Failed to load databank: {e:#}");
                    status = Some(format!("Error: {e:#}"));
                    http()
                }
            },
            None => http(),
        };
        let mut state = Self::new(config, source, worker);
        state.status_message = status;
        state
    }

    pub fn filter(&self) -> &FilterState {
        self.coordinator.filter()
    }

    pub fn is_refreshing(&self) -> bool {
        !self.coordinator.is_idle()
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    // ---- Triggers ----

    pub fn refresh(&mut self) {
        let request = self.coordinator.refresh_all();
        self.dispatch(request);
    }

    pub fn set_start(&mut self, year: i32) {
        let request = self.coordinator.set_start(year);
        self.dispatch(request);
    }

    pub fn set_end(&mut self, year: i32) {
        let request = self.coordinator.set_end(year);
        self.dispatch(request);
    }

    /// Record the current viewport size; charts refresh once it settles.
    pub fn observe_viewport(&mut self, size: [f32; 2], now: Instant) {
        self.resize.observe(size, now);
    }

    /// Switch data source and reload every chart.
    pub fn set_source(&mut self, source: Arc<dyn DataSource>) {
        log::info!("Using {}", source.describe());
        self.source = source;
        self.status_message = None;
        self.refresh();
    }

    pub fn open_databank(&mut self, path: &Path) {
        match DatabankSource::open(path, TopologyCache::new(&self.config.topology_path)) {
            Ok(source) => self.set_source(Arc::new(source)),
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    pub fn use_api(&mut self) {
        let source = http_source(&self.config);
        self.set_source(Arc::new(source));
    }

    // ---- Per-frame processing ----

    /// Apply finished fetches, fire a settled resize and advance animations.
    pub fn poll(&mut self, now: Instant) {
        while let Some(result) = self.worker.try_recv() {
            let completion = self.coordinator.complete(result.ticket, result.outcome);
            if let Disposition::Apply { chart, range, outcome } = completion.disposition {
                self.charts.apply(chart, range, outcome, now);
            }
            self.dispatch(completion.next);
        }

        if self.resize.take_due(now) {
            let request = self.coordinator.on_resize();
            self.dispatch(request);
        }

        self.charts.tick(now);
    }

    /// The next instant at which `poll` has timed work to do.
    pub fn next_wakeup(&self) -> Option<Instant> {
        [self.charts.next_due(), self.resize.deadline].into_iter().flatten().min()
    }

    fn dispatch(&mut self, request: Option<FetchRequest>) {
        let Some(request) = request else {
            return;
        };
        if self.worker.submit(request, Arc::clone(&self.source)) {
            return;
        }
        self.coordinator.abandon_pass();
        if let Err(e) = self.worker.respawn() {
            log::error!("Failed to restart the fetch worker: {e}");
            self.status_message = Some(format!("Error: data fetching stopped: {e}"));
            return;
        }
        // Run the pass again from the first chart on the new thread.
        if let Some(request) = self.coordinator.refresh_all() {
            if !self.worker.submit(request, Arc::clone(&self.source)) {
                self.coordinator.abandon_pass();
            }
        }
    }
}

fn http_source(config: &AppConfig) -> HttpDataSource {
    HttpDataSource::new(
        &config.api_url,
        config.request_timeout,
        TopologyCache::new(&config.topology_path),
    )
}

// ---------------------------------------------------------------------------
// Resize debounce
// ---------------------------------------------------------------------------

/// Turns a burst of viewport size changes into one refresh, `delay` after
/// the last change. The first observed size is the initial layout, not a
/// resize.
struct ResizeDebounce {
    delay: Duration,
    last_size: Option<[f32; 2]>,
    deadline: Option<Instant>,
}

impl ResizeDebounce {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_size: None,
            deadline: None,
        }
    }

    fn observe(&mut self, size: [f32; 2], now: Instant) {
        match self.last_size {
            Some(prev) if prev == size => {}
            Some(_) => {
                self.last_size = Some(size);
                self.deadline = Some(now + self.delay);
            }
            None => self.last_size = Some(size),
        }
    }

    fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::thread;

    use super::*;
    use crate::api::FetchError;
    use crate::api::wire::{AverageResponse, BubbleResponse, CauseRow, LineRow};
    use crate::charts::ViewState;
    use crate::data::filter::YearRange;
    use crate::data::topology::WorldMap;

    /// Records every request; the line endpoint always fails.
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(&'static str, YearRange)>>,
    }

    impl Recording {
        fn log(&self, what: &'static str, range: YearRange) {
            self.calls.lock().unwrap().push((what, range));
        }
    }

    impl DataSource for Recording {
        fn describe(&self) -> String {
            "recording".into()
        }
        fn average_life_expectancy(&self, range: YearRange) -> Result<AverageResponse, FetchError> {
            self.log("avg", range);
            Ok(BTreeMap::from([("FR".to_string(), 80.0)]))
        }
        fn bubble_rows(&self, range: YearRange) -> Result<BubbleResponse, FetchError> {
            self.log("bubble", range);
            Ok(BubbleResponse::new())
        }
        fn death_causes(&self, range: YearRange) -> Result<Vec<CauseRow>, FetchError> {
            self.log("bar", range);
            Ok(vec![CauseRow {
                date: range.start,
                name: "Injuries".into(),
                category: None,
                value: 7.0,
            }])
        }
        fn life_expectancy(&self, range: YearRange) -> Result<Vec<LineRow>, FetchError> {
            self.log("line", range);
            Err(FetchError::Status {
                url: "line".into(),
                status: 503,
            })
        }
        fn world_topology(&self) -> Result<Arc<WorldMap>, FetchError> {
            Ok(Arc::new(WorldMap::default()))
        }
    }

    fn state(source: Arc<Recording>) -> AppState {
        let config = AppConfig {
            years: YearRange::new(2000, 2010),
            ..AppConfig::default()
        };
        AppState::new(config, source, FetchWorker::spawn(|| {}).unwrap())
    }

    fn settle(state: &mut AppState) {
        for _ in 0..500 {
            state.poll(Instant::now());
            if !state.is_refreshing() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("refresh did not finish");
    }

    #[test]
    fn a_pass_fetches_each_chart_in_order_and_isolates_failures() {
        let source = Arc::new(Recording::default());
        let mut state = state(Arc::clone(&source));
        state.refresh();
        settle(&mut state);

        let calls: Vec<&str> = source.calls.lock().unwrap().iter().map(|c| c.0).collect();
        assert_eq!(calls, ["avg", "bubble", "bar", "line"]);
        assert!(matches!(state.charts.choropleth.state(), ViewState::Ready { .. }));
        assert!(matches!(state.charts.bubble.state(), ViewState::NoData(_)));
        assert!(matches!(state.charts.bar.state(), ViewState::Ready { .. }));
        assert!(matches!(state.charts.line.state(), ViewState::Failed { .. }));
    }

    #[test]
    fn rapid_filter_changes_end_with_the_latest_range() {
        let source = Arc::new(Recording::default());
        let mut state = state(Arc::clone(&source));
        state.set_end(2008);
        state.set_end(2007);
        state.set_end(2005);
        settle(&mut state);

        let latest = YearRange::new(2000, 2005);
        assert_eq!(state.filter().effective_range(), latest);
        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.last(), Some(&("line", latest)));
        // The first pass ends at its stale first response; the coalesced
        // pass fetches all four charts.
        assert_eq!(calls[0], ("avg", YearRange::new(2000, 2008)));
        assert_eq!(calls.len(), 5);
        assert!(calls[1..].iter().all(|c| c.1 == latest));
        match state.charts.bar.state() {
            ViewState::Ready { range, .. } => assert_eq!(*range, latest),
            _ => panic!("bar chart should be ready"),
        }
    }

    #[test]
    fn resize_refreshes_once_after_it_settles() {
        let t0 = Instant::now();
        let delay = Duration::from_millis(250);
        let mut debounce = ResizeDebounce::new(delay);
        debounce.observe([800.0, 600.0], t0);
        assert!(!debounce.take_due(t0 + delay));

        debounce.observe([900.0, 600.0], t0);
        debounce.observe([1000.0, 600.0], t0 + delay / 2);
        assert!(!debounce.take_due(t0 + delay));
        assert!(debounce.take_due(t0 + delay + delay / 2));
        assert!(!debounce.take_due(t0 + delay * 4));
    }

    #[test]
    fn stopped_worker_does_not_wedge_the_filter() {
        let source = Arc::new(Recording::default());
        let config = AppConfig {
            years: YearRange::new(2000, 2010),
            ..AppConfig::default()
        };
        let mut state = AppState::new(config, Arc::clone(&source) as Arc<dyn DataSource>, FetchWorker::stopped());
        state.set_end(2004);
        settle(&mut state);
        state.set_start(2001);
        settle(&mut state);

        let calls = source.calls.lock().unwrap();
        let ranges: Vec<YearRange> = calls.iter().map(|c| c.1).collect();
        assert_eq!(ranges.len(), 8);
        assert!(ranges[..4].iter().all(|r| *r == YearRange::new(2000, 2004)));
        assert!(ranges[4..].iter().all(|r| *r == YearRange::new(2001, 2004)));
    }

    #[test]
    fn failed_databank_keeps_current_source() {
        let source = Arc::new(Recording::default());
        let mut state = state(source);
        state.open_databank(Path::new("missing.csv"));
        assert_eq!(state.source_description(), "recording");
        assert!(state.status_message.as_deref().unwrap_or("").starts_with("Error"));
    }
}
