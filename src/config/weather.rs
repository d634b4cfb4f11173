// src/config/weather.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::normalize::DEFAULT_PRECISION;

// --- env defaults & names ---
pub const DEFAULT_WEATHER_CONFIG_PATH: &str = "config/weather.toml";
pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1";

pub const ENV_WEATHER_CONFIG_PATH: &str = "WEATHER_CONFIG_PATH";
pub const ENV_UPSTREAM_BASE_URL: &str = "WEATHER_UPSTREAM_BASE_URL";
pub const ENV_UPSTREAM_TIMEOUT_MS: &str = "WEATHER_UPSTREAM_TIMEOUT_MS";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "WEATHER_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "WEATHER_RETRY_DELAY_MS";
pub const ENV_CACHE_TTL_SECONDS: &str = "WEATHER_CACHE_TTL_SECONDS";
pub const ENV_CACHE_PRECISION: &str = "WEATHER_CACHE_PRECISION";
pub const ENV_CACHE_MAX_SIZE: &str = "WEATHER_CACHE_MAX_SIZE";
pub const ENV_ADMIN_ROUTES: &str = "WEATHER_ADMIN_ROUTES";

const MAX_PRECISION: u32 = 10;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_ms() -> u64 {
    3_000
}
fn default_max_attempts() -> u32 {
    2
}
fn default_delay_ms() -> u64 {
    100
}
fn default_ttl_seconds() -> u64 {
    60
}
fn default_precision() -> u32 {
    DEFAULT_PRECISION
}
fn default_max_size() -> u64 {
    10_000
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Applied to both connect and whole-request timeouts.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first call (0 disables retrying).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Decimal digits kept when normalizing coordinates.
    #[serde(default = "default_precision")]
    pub coordinate_precision: u32,
    #[serde(default = "default_max_size")]
    pub max_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            coordinate_precision: default_precision(),
            max_size: default_max_size(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Expose `POST /admin/cache/flush`.
    #[serde(default)]
    pub admin_routes: bool,
}

impl WeatherConfig {
    /// Defaults ← TOML file ← env overrides, then validated.
    ///
    /// File lookup:
    /// 1) $WEATHER_CONFIG_PATH (must exist)
    /// 2) config/weather.toml (optional)
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_WEATHER_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    bail!("{ENV_WEATHER_CONFIG_PATH} points to non-existent path");
                }
                Self::from_file(&pb)?
            }
            Err(_) => {
                let default = Path::new(DEFAULT_WEATHER_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env()?;
        cfg.validate()?;

        info!(
            target: "weather::config",
            base_url = %cfg.upstream.base_url,
            timeout_ms = cfg.upstream.timeout_ms,
            max_attempts = cfg.upstream.retry.max_attempts,
            ttl_seconds = cfg.cache.ttl_seconds,
            precision = cfg.cache.coordinate_precision,
            "weather config loaded"
        );
        Ok(cfg)
    }

    /// Parse a TOML file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading weather config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing weather config {}", path.display()))
    }

    /// Override fields from `WEATHER_*` env vars that are set.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = env::var(ENV_UPSTREAM_BASE_URL) {
            self.upstream.base_url = v.trim().to_string();
        }
        if let Some(v) = parse_env(ENV_UPSTREAM_TIMEOUT_MS)? {
            self.upstream.timeout_ms = v;
        }
        if let Some(v) = parse_env(ENV_RETRY_MAX_ATTEMPTS)? {
            self.upstream.retry.max_attempts = v;
        }
        if let Some(v) = parse_env(ENV_RETRY_DELAY_MS)? {
            self.upstream.retry.delay_ms = v;
        }
        if let Some(v) = parse_env(ENV_CACHE_TTL_SECONDS)? {
            self.cache.ttl_seconds = v;
        }
        if let Some(v) = parse_env(ENV_CACHE_PRECISION)? {
            self.cache.coordinate_precision = v;
        }
        if let Some(v) = parse_env(ENV_CACHE_MAX_SIZE)? {
            self.cache.max_size = v;
        }
        if let Ok(v) = env::var(ENV_ADMIN_ROUTES) {
            self.server.admin_routes = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.upstream.base_url)
            .with_context(|| format!("invalid upstream base_url '{}'", self.upstream.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("upstream base_url must be http(s), got '{}'", url.scheme());
        }
        if self.upstream.timeout_ms == 0 {
            bail!("upstream timeout_ms must be > 0");
        }
        if self.cache.ttl_seconds == 0 {
            bail!("cache ttl_seconds must be > 0");
        }
        if self.cache.max_size == 0 {
            bail!("cache max_size must be > 0");
        }
        if self.cache.coordinate_precision > MAX_PRECISION {
            bail!(
                "cache coordinate_precision must be <= {MAX_PRECISION}, got {}",
                self.cache.coordinate_precision
            );
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow!("{name} must be a non-negative integer, got '{raw}'")),
        Err(_) => Ok(None),
    }
}
