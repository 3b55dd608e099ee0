//! Left-ticket HTTP client.
//!
//! Queries the remote left-ticket endpoint for one (date, origin,
//! destination) triple. Transport failures and error statuses are retried
//! with exponential backoff; payloads are validated before being handed
//! to callers.

use chrono::{Local, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::warn;

use crate::domain::{Telecode, in_booking_window};

use super::error::RailwayError;

/// Default base URL for the ticketing system.
const DEFAULT_BASE_URL: &str = "https://kyfw.12306.cn";

/// Retry schedule for left-ticket requests.
///
/// The delay before retry `k` (0-based) is
/// `base_delay * backoff_multiplier^k`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub base_delay: std::time::Duration,

    /// Multiplier applied per retry.
    pub backoff_multiplier: u32,
}

impl RetryPolicy {
    /// The delay preceding retry `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> std::time::Duration {
        self.base_delay * self.backoff_multiplier.pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: std::time::Duration::from_secs(1),
            backoff_multiplier: 2,
        }
    }
}

/// Configuration for the left-ticket client.
#[derive(Debug, Clone)]
pub struct TicketClientConfig {
    /// Base URL for the ticketing system.
    pub base_url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Retry schedule.
    pub retry: RetryPolicy,
}

impl TicketClientConfig {
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

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the retry schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for TicketClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoded left-ticket query payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketQueryResult {
    /// Success flag; a missing flag is treated as failure.
    #[serde(default)]
    pub status: bool,

    /// Result container.
    #[serde(default)]
    pub data: TicketQueryData,
}

/// The `data` member of a left-ticket payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketQueryData {
    /// One `|`-delimited row per train.
    #[serde(default)]
    pub result: Vec<String>,
}

/// Left-ticket API client.
#[derive(Debug, Clone)]
pub struct TicketClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl TicketClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TicketClientConfig) -> Result<Self, RailwayError> {
        let mut headers = HeaderMap::new();

        // The endpoint rejects requests without a session cookie; an empty
        // one is accepted.
        headers.insert(reqwest::header::COOKIE, HeaderValue::from_static("JSESSIONID="));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RailwayError::Network {
                attempts: 0,
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url,
            retry: config.retry,
        })
    }

    /// Fetch availability for one (date, origin, destination) triple.
    ///
    /// Fails with [`RailwayError::DateRange`] before any network I/O when
    /// the date is outside the bookable window, with
    /// [`RailwayError::Network`] after exhausting retries, and with
    /// [`RailwayError::RemoteData`] when the payload is malformed or its
    /// status flag is false.
    pub async fn fetch_availability(
        &self,
        date: NaiveDate,
        from: Telecode,
        to: Telecode,
    ) -> Result<TicketQueryResult, RailwayError> {
        validate_date(date, Local::now().date_naive())?;

        let url = format!("{}/otn/leftTicket/queryG", self.base_url);
        let params = [
            ("leftTicketDTO.train_date", date.format("%Y-%m-%d").to_string()),
            ("leftTicketDTO.from_station", from.as_str().to_string()),
            ("leftTicketDTO.to_station", to.as_str().to_string()),
            ("purpose_codes", "ADULT".to_string()),
        ];

        let http = self.http.clone();
        let body = with_retry(&self.retry, move || {
            let http = http.clone();
            let url = url.clone();
            let params = params.clone();
            async move {
                let response = http
                    .get(&url)
                    .query(&params)
                    .send()
                    .await
                    .map_err(|e| e.to_string())?;

                let status = response.status();
                if !status.is_success() {
                    return Err(format!("HTTP {status}"));
                }

                response.text().await.map_err(|e| e.to_string())
            }
        })
        .await?;

        let result: TicketQueryResult = serde_json::from_str(&body).map_err(|e| {
            RailwayError::RemoteData(format!(
                "JSON parse error: {e} (body: {})",
                body.chars().take(200).collect::<String>()
            ))
        })?;

        if !result.status {
            return Err(RailwayError::RemoteData(
                "status flag missing or false".to_string(),
            ));
        }

        Ok(result)
    }
}

/// Check that a travel date is bookable as of `today`.
fn validate_date(date: NaiveDate, today: NaiveDate) -> Result<(), RailwayError> {
    if in_booking_window(date, today) {
        Ok(())
    } else {
        Err(RailwayError::DateRange { date, today })
    }
}

/// Run `op` with the retry schedule, treating any `Err` as retryable.
///
/// After the final attempt fails, returns [`RailwayError::Network`]
/// carrying the last failure detail.
pub(crate) async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RailwayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(detail) => {
                if attempt >= policy.max_retries {
                    return Err(RailwayError::Network {
                        attempts: attempt + 1,
                        detail,
                    });
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    remaining = policy.max_retries - attempt,
                    delay_ms = delay.as_millis() as u64,
                    detail = %detail,
                    "request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
