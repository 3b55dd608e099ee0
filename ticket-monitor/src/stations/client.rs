//! Station list client.
//!
//! The station directory is published as a JavaScript asset: one quoted
//! string of `@`-separated stations, each station a `|`-separated record
//! of abbreviation, display name, telecode, pinyin and sort index. Only
//! the display name and telecode are consumed here.

use crate::domain::Telecode;
use crate::railway::{RailwayError, RetryPolicy};

use super::error::StationError;

/// Default base URL for the ticketing system.
const DEFAULT_BASE_URL: &str = "https://kyfw.12306.cn";

/// One station parsed from the list payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationEntry {
    /// Display name, e.g. `北京南`.
    pub name: String,

    /// Station telecode, e.g. `VNP`.
    pub telecode: Telecode,
}

/// Configuration for the station list client.
#[derive(Debug, Clone)]
pub struct StationClientConfig {
    /// Base URL for the ticketing system.
    pub base_url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Retry schedule.
    pub retry: RetryPolicy,
}

impl StationClientConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Default for StationClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the station list asset.
#[derive(Debug, Clone)]
pub struct StationClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl StationClient {
    /// Create a new station list client.
    pub fn new(config: StationClientConfig) -> Result<Self, StationError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StationError::Network {
                attempts: 0,
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url,
            retry: config.retry,
        })
    }

    /// Fetch and parse the full station list.
    pub async fn fetch_all(&self) -> Result<Vec<StationEntry>, StationError> {
        let url = format!(
            "{}/otn/resources/js/framework/station_name.js",
            self.base_url
        );

        let http = self.http.clone();
        let body = crate::railway::with_retry(&self.retry, move || {
            let http = http.clone();
            let url = url.clone();
            async move {
                let response = http.get(&url).send().await.map_err(|e| e.to_string())?;

                let status = response.status();
                if !status.is_success() {
                    return Err(format!("HTTP {status}"));
                }

                response.text().await.map_err(|e| e.to_string())
            }
        })
        .await
        .map_err(|e| match e {
            RailwayError::Network { attempts, detail } => StationError::Network { attempts, detail },
            other => StationError::Network {
                attempts: 0,
                detail: other.to_string(),
            },
        })?;

        parse_station_list(&body)
    }
}

/// Parse the station list payload.
///
/// Extracts the single-quoted string and splits it into stations.
/// Stations with malformed telecodes are skipped rather than failing the
/// whole list.
pub(crate) fn parse_station_list(payload: &str) -> Result<Vec<StationEntry>, StationError> {
    let first = payload.find('\'').ok_or_else(|| StationError::Parse {
        message: "no quoted station string found".to_string(),
    })?;
    let last = payload.rfind('\'').ok_or_else(|| StationError::Parse {
        message: "no quoted station string found".to_string(),
    })?;
    if last <= first {
        return Err(StationError::Parse {
            message: "empty quoted station string".to_string(),
        });
    }

    let stations: Vec<StationEntry> = payload[first + 1..last]
        .split('@')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let fields: Vec<&str> = segment.split('|').collect();
            if fields.len() < 3 {
                return None;
            }
            let telecode = Telecode::parse(fields[2]).ok()?;
            Some(StationEntry {
                name: fields[1].to_string(),
                telecode,
            })
        })
        .collect();

    if stations.is_empty() {
        return Err(StationError::Parse {
            message: "station list contained no stations".to_string(),
        });
    }

    Ok(stations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "var station_names ='@bjb|北京北|VAP|beijingbei|bjb|0@bjp|北京|BJP|beijing|bj|1@sha|上海|SHH|shanghai|sh|2';";

    #[test]
    fn config_defaults() {
        let config = StationClientConfig::new();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn config_with_base_url() {
        let config = StationClientConfig::new().with_base_url("http://localhost:8080");
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn parse_sample_list() {
        let stations = parse_station_list(SAMPLE).unwrap();

        assert_eq!(stations.len(), 3);
        assert_eq!(stations[0].name, "北京北");
        assert_eq!(stations[0].telecode, Telecode::parse("VAP").unwrap());
        assert_eq!(stations[2].name, "上海");
        assert_eq!(stations[2].telecode, Telecode::parse("SHH").unwrap());
    }

    #[test]
    fn skips_malformed_entries() {
        let payload = "var s ='@bjp|北京|BJP|beijing|bj|1@broken@xxx|坏站|notacode|x|y|2';";
        let stations = parse_station_list(payload).unwrap();

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "北京");
    }

    #[test]
    fn rejects_payload_without_quotes() {
        assert!(matches!(
            parse_station_list("nothing here"),
            Err(StationError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_empty_list() {
        assert!(matches!(
            parse_station_list("var s ='';"),
            Err(StationError::Parse { .. })
        ));
    }
}
