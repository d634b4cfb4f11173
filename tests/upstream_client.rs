//! Integration tests for OpenMeteoClient using wiremock.
//!
//! Covered:
//! - request shape (path + query parameters)
//! - retry on 5xx, no retry on 4xx, retry exhaustion
//! - timeout / connection failure / parsing failure classification

use std::time::Duration;

use serde_json::json;
use weather_proxy::error::ErrorKind;
use weather_proxy::normalize;
use weather_proxy::upstream::{OpenMeteoClient, RetryPolicy, UpstreamClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create an Open-Meteo style body
fn forecast(lat: f64, lon: f64, temp: f64, wind: f64) -> serde_json::Value {
    json!({
        "latitude": lat,
        "longitude": lon,
        "generationtime_ms": 0.5,
        "utc_offset_seconds": 0,
        "timezone": "UTC",
        "timezone_abbreviation": "UTC",
        "elevation": 38.0,
        "current_units": {
            "time": "iso8601",
            "interval": "seconds",
            "temperature_2m": "°C",
            "wind_speed_10m": "km/h"
        },
        "current": {
            "time": "2026-01-11T10:00",
            "interval": 900,
            "temperature_2m": temp,
            "wind_speed_10m": wind
        }
    })
}

fn client(server: &MockServer, timeout_ms: u64) -> OpenMeteoClient {
    OpenMeteoClient::with_policy(
        &server.uri(),
        Duration::from_millis(timeout_ms),
        RetryPolicy::new(2, Duration::from_millis(10)),
    )
    .unwrap()
}

#[tokio::test]
async fn returns_parsed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast(52.52, 13.41, 5.5, 10.2)))
        .expect(1)
        .mount(&server)
        .await;

    let p = client(&server, 1_000)
        .fetch_current(&normalize(52.52, 13.41, 2))
        .await
        .unwrap();

    assert_eq!(p.latitude, 52.52);
    assert_eq!(p.longitude, 13.41);
    let cur = p.current.unwrap();
    assert_eq!(cur.temperature_2m, 5.5);
    assert_eq!(cur.wind_speed_10m, 10.2);
}

#[tokio::test]
async fn sends_normalized_coordinates_and_field_selector() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("latitude", "-33.86"))
        .and(query_param("longitude", "151.21"))
        .and(query_param("current", "temperature_2m,wind_speed_10m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast(-33.86, 151.21, 20.1, 3.0)))
        .expect(1)
        .mount(&server)
        .await;

    let p = client(&server, 1_000)
        .fetch_current(&normalize(-33.8567, 151.2093, 2))
        .await
        .unwrap();
    assert_eq!(p.current.unwrap().temperature_2m, 20.1);
}

#[tokio::test]
async fn retries_on_server_error_and_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast(52.53, 13.42, 5.5, 10.2)))
        .expect(1)
        .mount(&server)
        .await;

    let p = client(&server, 1_000)
        .fetch_current(&normalize(52.53, 13.42, 2))
        .await
        .expect("503 then 200 is invisible to the caller");
    assert_eq!(p.current.unwrap().temperature_2m, 5.5);
}

#[tokio::test]
async fn client_error_is_terminal_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 1_000)
        .fetch_current(&normalize(52.54, 13.43, 2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamServiceError);
    assert!(err.message().contains("400"), "{}", err.message());
}

#[tokio::test]
async fn server_error_after_exhausting_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server, 1_000)
        .fetch_current(&normalize(1.0, 2.0, 2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamServiceError);
}

#[tokio::test]
async fn missing_current_block_is_a_parsing_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 52.52,
            "longitude": 13.41,
            "generationtime_ms": 0.5,
            "utc_offset_seconds": 0,
            "timezone": "UTC",
            "timezone_abbreviation": "UTC",
            "elevation": 38.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 1_000)
        .fetch_current(&normalize(52.52, 13.41, 2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataParsingError);
}

#[tokio::test]
async fn malformed_body_is_a_parsing_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"latitude\": \"north\"}"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 1_000)
        .fetch_current(&normalize(52.52, 13.41, 2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataParsingError);
}

#[tokio::test]
async fn slow_upstream_is_a_timeout_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast(52.52, 13.41, 5.5, 10.2))
                .set_delay(Duration::from_millis(1_000)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server, 100)
        .fetch_current(&normalize(52.52, 13.41, 2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamTimeout);
}

#[tokio::test]
async fn unreachable_upstream_is_unavailable() {
    // Reserve a free port, then release it so nothing listens there.
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };

    let c = OpenMeteoClient::with_policy(
        &uri,
        Duration::from_millis(500),
        RetryPolicy::new(1, Duration::from_millis(10)),
    )
    .unwrap();
    let err = c.fetch_current(&normalize(52.52, 13.41, 2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
}
