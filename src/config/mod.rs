// src/config/mod.rs
pub mod weather;

pub use weather::{CacheConfig, RetryConfig, ServerConfig, UpstreamConfig, WeatherConfig};
