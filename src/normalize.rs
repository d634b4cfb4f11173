// src/normalize.rs
//! Coordinate normalization and cache-key derivation.
//!
//! Raw coordinates are rounded half-away-from-zero on each axis independently.
//! Rounding is performed on the shortest decimal representation of the input,
//! so `1.005` rounds to `1.01` rather than to the binary artefact `1.00`.

use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

pub const DEFAULT_PRECISION: u32 = 2;

/// Raw, unrounded coordinate as received from the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Coordinate rounded to `precision` decimal digits.
///
/// Serialized as `{"lat": .., "lon": ..}` in the public response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedCoordinate {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(skip)]
    pub precision: u32,
}

impl NormalizedCoordinate {
    /// Latitude formatted with exactly `precision` fractional digits.
    pub fn latitude_param(&self) -> String {
        fixed(self.latitude, self.precision)
    }

    /// Longitude formatted with exactly `precision` fractional digits.
    pub fn longitude_param(&self) -> String {
        fixed(self.longitude, self.precision)
    }
}

pub fn normalize(latitude: f64, longitude: f64, precision: u32) -> NormalizedCoordinate {
    NormalizedCoordinate {
        latitude: round_half_up(latitude, precision),
        longitude: round_half_up(longitude, precision),
        precision,
    }
}

/// `"{lat}:{lon}"` with fixed precision, e.g. `52.52:13.41`.
pub fn cache_key(norm: &NormalizedCoordinate) -> String {
    format!("{}:{}", norm.latitude_param(), norm.longitude_param())
}

fn fixed(value: f64, precision: u32) -> String {
    format!("{:.*}", precision as usize, value)
}

/// Round half-away-from-zero at `precision` decimal digits.
///
/// Non-finite values are returned unchanged. Negative zero becomes zero.
pub fn round_half_up(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    // Display for f64 is the shortest representation that round-trips and
    // never uses exponent notation.
    let Some(exact) = Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(value))
    else {
        return canonical(value);
    };
    let rounded = exact.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    canonical(rounded.to_f64().unwrap_or(value))
}

fn canonical(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}
