use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::data::filter::YearRange;

// ---------------------------------------------------------------------------
// Application configuration
// ---------------------------------------------------------------------------

/// Runtime settings, read from `HEALTH_ATLAS_*` environment variables
/// (optionally provided through a `.env` file).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the statistics API.
    pub api_url: String,
    /// TopoJSON file with a `countries` object.
    pub topology_path: PathBuf,
    /// Databank export to use instead of the API, if any.
    pub databank_path: Option<PathBuf>,
    /// Supported year span; also the default filter.
    pub years: YearRange,
    /// Delay between animation frames.
    pub frame_interval: Duration,
    /// Quiet period after the last window resize before charts refresh.
    pub resize_debounce: Duration,
    /// Timeout for a single API request.
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_url: "http://127.0.0.1:8000".to_string(),
            topology_path: PathBuf::from("data/world-topo.json"),
            databank_path: None,
            years: YearRange::new(1960, 2023),
            frame_interval: Duration::from_millis(1000),
            resize_debounce: Duration::from_millis(250),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = AppConfig::default();

        let first_year = parse_var(&lookup, "HEALTH_ATLAS_FIRST_YEAR")?.unwrap_or(defaults.years.start);
        let last_year = parse_var(&lookup, "HEALTH_ATLAS_LAST_YEAR")?.unwrap_or(defaults.years.end);
        if first_year >= last_year {
            bail!("HEALTH_ATLAS_FIRST_YEAR ({first_year}) must be before HEALTH_ATLAS_LAST_YEAR ({last_year})");
        }

        let millis = |key: &str, default: Duration| -> Result<Duration> {
            let ms: Option<u64> = parse_var(&lookup, key)?;
            Ok(ms.map(Duration::from_millis).unwrap_or(default))
        };

        Ok(AppConfig {
            api_url: lookup("HEALTH_ATLAS_API_URL").unwrap_or(defaults.api_url),
            topology_path: lookup("HEALTH_ATLAS_TOPOLOGY")
                .map(PathBuf::from)
                .unwrap_or(defaults.topology_path),
            databank_path: lookup("HEALTH_ATLAS_DATABANK")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            years: YearRange::new(first_year, last_year),
            frame_interval: millis("HEALTH_ATLAS_FRAME_MS", defaults.frame_interval)?,
            resize_debounce: millis("HEALTH_ATLAS_RESIZE_DEBOUNCE_MS", defaults.resize_debounce)?,
            request_timeout: millis("HEALTH_ATLAS_TIMEOUT_MS", defaults.request_timeout)?,
        })
    }
}

fn parse_var<T, L>(lookup: &L, key: &str) -> Result<Option<T>>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: '{raw}'"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(config(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("HEALTH_ATLAS_API_URL", "http://stats.local:9000"),
            ("HEALTH_ATLAS_DATABANK", "exports/databank.parquet"),
            ("HEALTH_ATLAS_FIRST_YEAR", "1990"),
            ("HEALTH_ATLAS_LAST_YEAR", " 2020 "),
            ("HEALTH_ATLAS_FRAME_MS", "400"),
        ])
        .unwrap();
        assert_eq!(cfg.api_url, "http://stats.local:9000");
        assert_eq!(cfg.databank_path, Some(PathBuf::from("exports/databank.parquet")));
        assert_eq!(cfg.years, YearRange::new(1990, 2020));
        assert_eq!(cfg.frame_interval, Duration::from_millis(400));
        assert_eq!(cfg.resize_debounce, Duration::from_millis(250));
    }

    #[test]
    fn rejects_bad_values() {
        let err = config(&[("HEALTH_ATLAS_FIRST_YEAR", "sixties")]).unwrap_err();
        assert!(format!("{err:#}").contains("HEALTH_ATLAS_FIRST_YEAR"));
        assert!(config(&[("HEALTH_ATLAS_FIRST_YEAR", "2000"), ("HEALTH_ATLAS_LAST_YEAR", "2000")]).is_err());
    }
}
