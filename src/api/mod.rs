/// Data sources for the charts.
///
/// A [`DataSource`] answers the four range queries of the statistics API and
/// provides the world map. [`fetch_chart`] turns those raw answers into the
/// payload one chart needs; it runs on the fetch worker, never on the UI
/// thread.

pub mod http;
pub mod offline;
pub mod wire;

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::charts::bar::BarData;
use crate::charts::bubble::BubbleData;
use crate::charts::choropleth::ChoroplethData;
use crate::charts::line::LineData;
use crate::charts::{ChartKind, ChartPayload};
use crate::data::filter::YearRange;
use crate::data::frame::build_frames;
use crate::data::store::TimeSeriesStore;
use crate::data::topology::{TopologyError, WorldMap};

use wire::{AverageResponse, BubbleResponse, CauseRow, LineRow};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a chart could not get its data. Only the affected chart fails.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("could not read the response from {url}: {source}")]
    Body {
        url: String,
        source: std::io::Error,
    },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
    #[error("could not read {}: {source}", path.display())]
    TopologyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid world map {}: {source}", path.display())]
    Topology {
        path: PathBuf,
        source: TopologyError,
    },
}

// ---------------------------------------------------------------------------
// DataSource
// ---------------------------------------------------------------------------

/// The queries behind the four charts. Empty answers mean "no data".
pub trait DataSource: Send + Sync {
    /// Shown in the status line.
    fn describe(&self) -> String;

    fn average_life_expectancy(&self, range: YearRange) -> Result<AverageResponse, FetchError>;

    fn bubble_rows(&self, range: YearRange) -> Result<BubbleResponse, FetchError>;

    fn death_causes(&self, range: YearRange) -> Result<Vec<CauseRow>, FetchError>;

    fn life_expectancy(&self, range: YearRange) -> Result<Vec<LineRow>, FetchError>;

    fn world_topology(&self) -> Result<Arc<WorldMap>, FetchError>;
}

/// Fetch and prepare the payload for one chart.
pub fn fetch_chart(
    source: &dyn DataSource,
    chart: ChartKind,
    range: YearRange,
) -> Result<ChartPayload, FetchError> {
    let payload = match chart {
        ChartKind::Choropleth => {
            let averages = source.average_life_expectancy(range)?;
            let map = source.world_topology()?;
            ChartPayload::Choropleth(ChoroplethData::new(averages, map))
        }
        ChartKind::ScatterBubble => {
            let rows = source.bubble_rows(range)?;
            let store = TimeSeriesStore::load(wire::bubble_records(rows));
            log::debug!(
                "bubble rows for {range}: {} entities, observed {:?}",
                store.entities().count(),
                store.observed_span()
            );
            ChartPayload::Bubble(BubbleData::new(build_frames(&store, range)))
        }
        ChartKind::Bar => ChartPayload::Bar(BarData::from_rows(source.death_causes(range)?)),
        ChartKind::Line => ChartPayload::Line(LineData::from_rows(source.life_expectancy(range)?)),
    };
    Ok(payload)
}

// ---------------------------------------------------------------------------
// TopologyCache – the world map is read once per source
// ---------------------------------------------------------------------------

pub struct TopologyCache {
    path: PathBuf,
    object: String,
    map: Mutex<Option<Arc<WorldMap>>>,
}

impl TopologyCache {
    /// Countries are read from the `countries` object of the file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TopologyCache {
            path: path.into(),
            object: "countries".to_string(),
            map: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Result<Arc<WorldMap>, FetchError> {
        let mut slot = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(map) = slot.as_ref() {
            return Ok(Arc::clone(map));
        }

        let text = fs::read_to_string(&self.path).map_err(|source| FetchError::TopologyFile {
            path: self.path.clone(),
            source,
        })?;
        let map = WorldMap::from_topojson(&text, &self.object).map_err(|source| {
            FetchError::Topology {
                path: self.path.clone(),
                source,
            }
        })?;
        log::info!(
            "Loaded {} country shapes from {}",
            map.countries.len(),
            self.path.display()
        );

        let map = Arc::new(map);
        *slot = Some(Arc::clone(&map));
        Ok(map)
    }
}
