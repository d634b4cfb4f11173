// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod service;
pub mod upstream;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::WeatherConfig;
pub use crate::error::{ErrorKind, WeatherError};
pub use crate::normalize::{cache_key, normalize, Coordinate, NormalizedCoordinate};
pub use crate::service::{CacheStatus, WeatherService, WeatherSnapshot};

use std::sync::Arc;

use axum::Router;

use crate::metrics::Metrics;
use crate::upstream::{DynUpstream, OpenMeteoClient};

/// Build the full router from `WeatherConfig::load()` (file + env).
pub async fn app() -> anyhow::Result<Router> {
    let cfg = WeatherConfig::load()?;
    build_app(&cfg)
}

/// Wire upstream client, service, cache and metrics from an explicit config.
pub fn build_app(cfg: &WeatherConfig) -> anyhow::Result<Router> {
    let upstream: DynUpstream = Arc::new(OpenMeteoClient::new(&cfg.upstream)?);
    let service = Arc::new(WeatherService::from_config(upstream, cfg));
    let metrics = Metrics::init(cfg.cache.ttl_seconds)?;

    let state = AppState::new(service, cfg.server.admin_routes);
    Ok(api::router(state).merge(metrics.router()))
}
