use anyhow::{anyhow, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the cache TTL gauge.
    pub fn init(ttl_seconds: u64) -> Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                // Use default buckets to avoid API differences across crate versions.
                let handle = PrometheusBuilder::new()
                    .install_recorder()
                    .map_err(|e| anyhow!("prometheus: install recorder: {e}"))?;
                describe_series();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();

        // Absolute TTL (expire-after-write, no sliding refresh)
        gauge!("weather_cache_ttl_seconds").set(ttl_seconds as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_series() {
    describe_counter!("weather_cache_hits_total", "Requests served from the cache.");
    describe_counter!(
        "weather_cache_misses_total",
        "Requests that had to go upstream."
    );
    describe_counter!(
        "weather_upstream_requests_total",
        "Upstream fetches by outcome (after retries)."
    );
    describe_counter!(
        "weather_upstream_retries_total",
        "Upstream attempts that were retried."
    );
    describe_histogram!(
        "weather_upstream_duration_ms",
        "Upstream fetch time including retries, in milliseconds."
    );
    describe_gauge!("weather_cache_ttl_seconds", "Configured cache TTL.");
}
