// src/service.rs
//! Read-through weather service: normalize → key → cache → upstream on miss.
//!
//! Concurrent misses for the same key are not coalesced; each may reach the
//! upstream and the last write wins. Values are identical in shape, so readers
//! never observe a partially built snapshot.

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::cache::SnapshotCache;
use crate::config::WeatherConfig;
use crate::error::{Result, WeatherError};
use crate::normalize::{cache_key, normalize, Coordinate, NormalizedCoordinate};
use crate::upstream::DynUpstream;

/// Stamped into every snapshot.
pub const SOURCE: &str = "open-meteo";

/// Public, immutable result. Serializes to the response body shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub location: NormalizedCoordinate,
    pub current: CurrentConditions,
    pub source: String,
    #[serde(serialize_with = "serialize_utc_seconds")]
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub wind_speed_kmh: f64,
}

/// `2026-01-11T10:12:54Z`
pub fn format_utc_seconds(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn serialize_utc_seconds<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_utc_seconds(ts))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_header(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub snapshot: WeatherSnapshot,
    pub cache: CacheStatus,
}

pub struct WeatherService {
    upstream: DynUpstream,
    cache: SnapshotCache,
    precision: u32,
}

impl WeatherService {
    pub fn new(upstream: DynUpstream, cache: SnapshotCache, precision: u32) -> Self {
        Self {
            upstream,
            cache,
            precision,
        }
    }

    pub fn from_config(upstream: DynUpstream, cfg: &WeatherConfig) -> Self {
        Self::new(
            upstream,
            SnapshotCache::from_config(&cfg.cache),
            cfg.cache.coordinate_precision,
        )
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub async fn get_current_weather(&self, raw: Coordinate) -> Result<WeatherSnapshot> {
        self.lookup(raw).await.map(|l| l.snapshot)
    }

    /// Same as [`Self::get_current_weather`] but reports hit/miss.
    pub async fn lookup(&self, raw: Coordinate) -> Result<Lookup> {
        let norm = normalize(raw.latitude, raw.longitude, self.precision);
        let key = cache_key(&norm);

        if let Some(snapshot) = self.cache.get(&key).await {
            counter!("weather_cache_hits_total").increment(1);
            debug!(target: "weather::service", %key, "cache hit");
            return Ok(Lookup {
                snapshot,
                cache: CacheStatus::Hit,
            });
        }

        counter!("weather_cache_misses_total").increment(1);
        info!(
            target: "weather::service",
            %key,
            lat = raw.latitude,
            lon = raw.longitude,
            "cache miss, fetching from {}",
            self.upstream.name()
        );

        // Runs detached so a dropped request still fills the cache.
        let fill = tokio::spawn(fetch_and_store(
            self.upstream.clone(),
            self.cache.clone(),
            norm,
            key,
        ));
        let snapshot = fill.await.map_err(|e| {
            WeatherError::internal("Upstream fetch task failed").with_source(e)
        })??;

        Ok(Lookup {
            snapshot,
            cache: CacheStatus::Miss,
        })
    }

    /// Drop every cached snapshot.
    pub fn flush(&self) {
        info!(target: "weather::service", "cache flushed");
        self.cache.clear();
    }
}

async fn fetch_and_store(
    upstream: DynUpstream,
    cache: SnapshotCache,
    norm: NormalizedCoordinate,
    key: String,
) -> Result<WeatherSnapshot> {
    let payload = upstream.fetch_current(&norm).await?;
    let current = payload
        .current
        .ok_or_else(|| WeatherError::data_parsing("No current weather data in response"))?;

    let snapshot = WeatherSnapshot {
        location: norm,
        current: CurrentConditions {
            temperature_c: current.temperature_2m,
            wind_speed_kmh: current.wind_speed_10m,
        },
        source: SOURCE.to_string(),
        retrieved_at: Utc::now(),
    };
    cache.put(key, snapshot.clone()).await;
    Ok(snapshot)
}
