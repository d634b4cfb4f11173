// src/upstream/mod.rs
//! Upstream provider abstraction and wire types.

pub mod open_meteo;
pub mod retry;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::normalize::NormalizedCoordinate;

pub use open_meteo::OpenMeteoClient;
pub use retry::{Failure, RetryDecision, RetryPolicy};

/// Fetches current conditions for an already-normalized coordinate.
///
/// Implementations own timeouts, retries and failure classification; callers
/// only ever see a parsed payload or a classified [`crate::error::WeatherError`].
#[async_trait::async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch_current(&self, at: &NormalizedCoordinate) -> Result<UpstreamWeatherPayload>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynUpstream = Arc<dyn UpstreamClient>;

/// Raw provider response. Only `latitude`/`longitude` are mandatory on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamWeatherPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "generationtime_ms")]
    pub generation_time_ms: Option<f64>,
    pub utc_offset_seconds: Option<i32>,
    pub timezone: Option<String>,
    pub timezone_abbreviation: Option<String>,
    pub elevation: Option<f64>,
    pub current_units: Option<CurrentUnits>,
    /// Missing `current` is a data error, not "no data".
    pub current: Option<CurrentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUnits {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub temperature_2m: String,
    #[serde(default)]
    pub wind_speed_10m: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentBlock {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub interval: u32,
    pub temperature_2m: f64,
    pub wind_speed_10m: f64,
}
