// src/upstream/open_meteo.rs
//! Open-Meteo forecast API client: one GET per attempt, bounded retry,
//! failures classified into [`ErrorKind`]s.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::retry::{Failure, RetryPolicy};
use super::{UpstreamClient, UpstreamWeatherPayload};
use crate::config::UpstreamConfig;
use crate::error::{ErrorKind, Result, WeatherError};
use crate::normalize::NormalizedCoordinate;

pub const FORECAST_PATH: &str = "/forecast";
/// Field selector sent as the `current` query parameter.
pub const CURRENT_FIELDS: &str = "temperature_2m,wind_speed_10m";

const USER_AGENT: &str = concat!("weather-proxy/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    forecast_url: String,
    retry: RetryPolicy,
}

impl OpenMeteoClient {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self> {
        Self::with_policy(
            &cfg.base_url,
            cfg.timeout(),
            RetryPolicy::from(&cfg.retry),
        )
    }

    pub fn with_policy(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::internal("Failed to build upstream HTTP client").with_source(e))?;
        let forecast_url = format!("{}{}", base_url.trim_end_matches('/'), FORECAST_PATH);
        Ok(Self {
            http,
            forecast_url,
            retry,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn attempt(
        &self,
        at: &NormalizedCoordinate,
        attempt: u32,
    ) -> std::result::Result<UpstreamWeatherPayload, Failure> {
        debug!(
            target: "weather::upstream",
            lat = %at.latitude_param(),
            lon = %at.longitude_param(),
            attempt,
            "fetching current weather"
        );
        let resp = self
            .http
            .get(&self.forecast_url)
            .query(&[
                ("latitude", at.latitude_param()),
                ("longitude", at.longitude_param()),
                ("current", CURRENT_FIELDS.to_string()),
            ])
            .send()
            .await
            .map_err(transport_failure)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_failure(status));
        }

        let body = resp.bytes().await.map_err(transport_failure)?;
        parse_payload(&body).map_err(Failure::terminal)
    }
}

#[async_trait::async_trait]
impl UpstreamClient for OpenMeteoClient {
    async fn fetch_current(&self, at: &NormalizedCoordinate) -> Result<UpstreamWeatherPayload> {
        let started = Instant::now();
        let out = self.retry.run(|attempt| self.attempt(at, attempt)).await;
        histogram!("weather_upstream_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        let outcome = match &out {
            Ok(_) => "ok",
            Err(e) => e.kind().code(),
        };
        counter!("weather_upstream_requests_total", "outcome" => outcome).increment(1);

        if let Err(e) = &out {
            warn!(
                target: "weather::upstream",
                kind = %e.kind(),
                error = %e,
                "upstream fetch failed"
            );
        }
        out
    }

    fn name(&self) -> &'static str {
        "open-meteo"
    }
}

/// Classify a transport-level error. Everything here is retryable except
/// failures to build the request locally.
pub(crate) fn transport_failure(e: reqwest::Error) -> Failure {
    if e.is_timeout() {
        return Failure::retryable(
            WeatherError::upstream_timeout("Failed to fetch weather data within timeout")
                .with_source(e),
        );
    }
    if e.is_builder() {
        return Failure::terminal(
            WeatherError::internal("Failed to build upstream request").with_source(e),
        );
    }
    // connect (refused, DNS), reset mid-request, truncated body
    Failure::retryable(
        WeatherError::upstream_unavailable("Cannot connect to upstream service").with_source(e),
    )
}

/// 5xx is retryable; any other non-success status is terminal.
pub(crate) fn status_failure(status: StatusCode) -> Failure {
    let err = WeatherError::upstream_service(format!(
        "Upstream weather service returned {status}"
    ));
    if status.is_server_error() {
        Failure::retryable(err)
    } else {
        Failure::terminal(err)
    }
}

/// Parse a 200 body; a payload without `current` is a data error.
pub(crate) fn parse_payload(body: &[u8]) -> Result<UpstreamWeatherPayload> {
    let payload: UpstreamWeatherPayload = serde_json::from_slice(body).map_err(|e| {
        WeatherError::data_parsing("Failed to parse weather data from upstream").with_source(e)
    })?;
    if payload.current.is_none() {
        return Err(WeatherError::new(
            ErrorKind::DataParsingError,
            "No current weather data in response",
        ));
    }
    Ok(payload)
}
