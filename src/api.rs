// src/api.rs
//! HTTP boundary: query validation, routing, and error → status mapping.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::error::{ErrorKind, WeatherError};
use crate::normalize::Coordinate;
use crate::service::{format_utc_seconds, WeatherService};

pub const CURRENT_WEATHER_PATH: &str = "/api/v1/weather/current";
pub const CACHE_HEADER: &str = "x-weather-cache";

const LAT_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;
const LON_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WeatherService>,
    pub admin_routes: bool,
}

impl AppState {
    pub fn new(service: Arc<WeatherService>, admin_routes: bool) -> Self {
        Self {
            service,
            admin_routes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let mut r = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/health/liveness", get(health_up))
        .route("/health/readiness", get(health_up))
        .route(CURRENT_WEATHER_PATH, get(current_weather));

    if state.admin_routes {
        r = r.route("/admin/cache/flush", post(admin_flush_cache));
    }

    r.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthOut {
    status: &'static str,
}

async fn health_up() -> Json<HealthOut> {
    Json(HealthOut { status: "UP" })
}

async fn current_weather(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<CoordinateQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let path = uri.path().to_string();
    let Query(q) = query.map_err(|rej| ParamError::Malformed(rej.body_text()).at(&path))?;
    let raw = parse_coordinate(&q).map_err(|e| e.at(&path))?;

    info!(
        target: "weather::api",
        lat = raw.latitude,
        lon = raw.longitude,
        "current weather requested"
    );

    let lookup = state
        .service
        .lookup(raw)
        .await
        .map_err(|e| ApiError::from_weather(e, &path))?;

    let mut resp = Json(lookup.snapshot).into_response();
    resp.headers_mut().insert(
        HeaderName::from_static(CACHE_HEADER),
        HeaderValue::from_static(lookup.cache.as_header()),
    );
    Ok(resp)
}

#[derive(Serialize)]
struct FlushOut {
    flushed: bool,
}

async fn admin_flush_cache(State(state): State<AppState>) -> Json<FlushOut> {
    state.service.flush();
    Json(FlushOut { flushed: true })
}

/* ----------------------------
Query validation
---------------------------- */

/// Raw `lat`/`lon` query values; numbers are parsed in [`parse_coordinate`]
/// so each failure gets its own code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoordinateQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// Validation failure before the core is invoked. All map to `InvalidInput`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// Query string the extractor could not deserialize (e.g. a repeated key).
    Malformed(String),
    Missing(&'static str),
    NotANumber(&'static str),
    OutOfRange(&'static str),
}

impl ParamError {
    fn code(&self) -> &'static str {
        match self {
            ParamError::Missing(_) => "MISSING_PARAMETER",
            ParamError::Malformed(_) | ParamError::NotANumber(_) => "VALIDATION_ERROR",
            ParamError::OutOfRange(_) => ErrorKind::InvalidInput.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            ParamError::Malformed(detail) => format!("Invalid query string: {detail}"),
            ParamError::Missing(name) => format!("Required parameter '{name}' is missing"),
            ParamError::NotANumber(name) => format!("Parameter '{name}' must be a decimal number"),
            ParamError::OutOfRange("lat") => "Latitude must be between -90 and 90".to_string(),
            ParamError::OutOfRange(_) => "Longitude must be between -180 and 180".to_string(),
        }
    }

    fn at(self, path: &str) -> ApiError {
        ApiError {
            kind: ErrorKind::InvalidInput,
            code: self.code(),
            message: self.message(),
            path: path.to_string(),
        }
    }
}

/// Both parameters required; ranges inclusive. NaN and infinities fail the range check.
pub fn parse_coordinate(q: &CoordinateQuery) -> Result<Coordinate, ParamError> {
    let lat = parse_param(q.lat.as_deref(), "lat")?;
    let lon = parse_param(q.lon.as_deref(), "lon")?;
    if !LAT_RANGE.contains(&lat) {
        return Err(ParamError::OutOfRange("lat"));
    }
    if !LON_RANGE.contains(&lon) {
        return Err(ParamError::OutOfRange("lon"));
    }
    Ok(Coordinate::new(lat, lon))
}

fn parse_param(value: Option<&str>, name: &'static str) -> Result<f64, ParamError> {
    let raw = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ParamError::Missing(name))?;
    raw.parse::<f64>().map_err(|_| ParamError::NotANumber(name))
}

/* ----------------------------
Error responses
---------------------------- */

#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    code: &'static str,
    message: String,
    path: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    timestamp: String,
    path: String,
}

impl ApiError {
    /// Map a core error; internal details are logged, never returned.
    pub fn from_weather(err: WeatherError, path: &str) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::InternalError => {
                error!(target: "weather::api", error = ?err, "unexpected error");
                "An unexpected error occurred".to_string()
            }
            _ => {
                warn!(target: "weather::api", %kind, error = %err, "request failed");
                err.message().to_string()
            }
        };
        Self {
            kind,
            code: kind.code(),
            message,
            path: path.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::UpstreamServiceError => StatusCode::BAD_GATEWAY,
        ErrorKind::DataParsingError => StatusCode::BAD_GATEWAY,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::InvalidInput {
            warn!(target: "weather::api", code = self.code, message = %self.message, "rejected request");
        }
        let body = ErrorBody {
            error: self.code,
            message: self.message,
            timestamp: format_utc_seconds(&Utc::now()),
            path: self.path,
        };
        (status_for(self.kind), Json(body)).into_response()
    }
}
