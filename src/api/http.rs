use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::wire::{AverageResponse, BubbleResponse, CauseRow, LineRow};
use super::{DataSource, FetchError, TopologyCache};
use crate::data::filter::YearRange;
use crate::data::topology::WorldMap;

// ---------------------------------------------------------------------------
// HttpDataSource – the statistics REST API
// ---------------------------------------------------------------------------

/// Client for `GET {base}/{endpoint}/{start}/{end}`.
pub struct HttpDataSource {
    base_url: String,
    agent: ureq::Agent,
    topology: TopologyCache,
}

impl HttpDataSource {
    pub fn new(base_url: &str, timeout: Duration, topology: TopologyCache) -> Self {
        HttpDataSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            topology,
        }
    }

    fn url(&self, endpoint: &str, range: YearRange) -> String {
        format!("{}/{endpoint}/{}/{}", self.base_url, range.start, range.end)
    }

    fn get<T: DeserializeOwned + Default>(&self, endpoint: &str, range: YearRange) -> Result<T, FetchError> {
        let url = self.url(endpoint, range);
        log::debug!("GET {url}");

        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(FetchError::Status { url, status }),
            Err(err) => {
                return Err(FetchError::Transport {
                    url,
                    message: err.to_string(),
                });
            }
        };
        let body = match response.into_string() {
            Ok(body) => body,
            Err(source) => return Err(FetchError::Body { url, source }),
        };
        decode_body(&body).map_err(|source| FetchError::Decode { url, source })
    }
}

/// An empty body or a literal `null` means the API has nothing for the range.
pub fn decode_body<T: DeserializeOwned + Default>(body: &str) -> Result<T, serde_json::Error> {
    let body = body.trim();
    if body.is_empty() || body == "null" {
        return Ok(T::default());
    }
    serde_json::from_str(body)
}

impl DataSource for HttpDataSource {
    fn describe(&self) -> String {
        format!("API {}", self.base_url)
    }

    fn average_life_expectancy(&self, range: YearRange) -> Result<AverageResponse, FetchError> {
        self.get("avg-values", range)
    }

    fn bubble_rows(&self, range: YearRange) -> Result<BubbleResponse, FetchError> {
        self.get("bubble-data", range)
    }

    fn death_causes(&self, range: YearRange) -> Result<Vec<CauseRow>, FetchError> {
        self.get("bar-chart-data", range)
    }

    fn life_expectancy(&self, range: YearRange) -> Result<Vec<LineRow>, FetchError> {
        self.get("line-chart-data", range)
    }

    fn world_topology(&self) -> Result<Arc<WorldMap>, FetchError> {
        self.topology.get()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Serve one canned HTTP response and return the base URL plus the
    /// request line the server received.
    fn serve_once(status: &str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let status = status.to_string();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 2 {
                line.clear();
            }
            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            request_line.trim().to_string()
        });
        (base, handle)
    }

    fn source(base: &str) -> HttpDataSource {
        HttpDataSource::new(
            base,
            Duration::from_secs(5),
            TopologyCache::new("/nonexistent/world.json"),
        )
    }

    #[test]
    fn requests_range_endpoint_and_decodes() {
        let (base, server) = serve_once("200 OK", r#"[{"date": 2001, "name": "Chad", "value": 50.5}]"#);
        let rows = source(&format!("{base}/")).life_expectancy(YearRange::new(2000, 2005)).unwrap();
        assert_eq!(server.join().unwrap(), "GET /line-chart-data/2000/2005 HTTP/1.1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, Some(50.5));
    }

    #[test]
    fn empty_body_is_no_data() {
        let (base, server) = serve_once("200 OK", "");
        let averages = source(&base).average_life_expectancy(YearRange::new(1960, 1961)).unwrap();
        server.join().unwrap();
        assert!(averages.is_empty());
    }

    #[test]
    fn server_error_is_a_status_failure() {
        let (base, server) = serve_once("500 Internal Server Error", "boom");
        let err = source(&base).death_causes(YearRange::new(2000, 2001)).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
    }

    #[test]
    fn null_and_garbage_bodies() {
        assert!(decode_body::<AverageResponse>("null").unwrap().is_empty());
        assert!(decode_body::<Vec<LineRow>>("  \n").unwrap().is_empty());
        assert!(decode_body::<Vec<LineRow>>("{\"detail\": 1}").is_err());
    }
}
