use std::{collections::HashMap, net::SocketAddr, time::Duration};

use axum::{
    extract::{Path, Query},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use octopus_client::{
    domain::{MeterPoint, PointType},
    ClientError, ConsumptionSource, OctopusClient,
};
use time::macros::datetime;

// base64("sk_test_key:")
const EXPECTED_AUTH: &str = "Basic c2tfdGVzdF9rZXk6";

async fn consumption(
    Path((kind, point, meter)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let auth = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if auth != Some(EXPECTED_AUTH) {
        return (StatusCode::UNAUTHORIZED, r#"{"detail":"Authentication failed."}"#).into_response();
    }
    if query.get("page_size").map(String::as_str) != Some("1") {
        return (StatusCode::BAD_REQUEST, "page_size must be 1").into_response();
    }

    match (kind.as_str(), point.as_str(), meter.as_str()) {
        ("electricity-meter-points", "1200000000000", "21L0000000") => Json(serde_json::json!({
            "count": 17000,
            "next": null,
            "previous": null,
            "results": [{
                "consumption": 0.318,
                "interval_start": "2024-03-10T12:00:00Z",
                "interval_end": "2024-03-10T12:30:00Z"
            }]
        }))
        .into_response(),
        ("gas-meter-points", "9000000000", "G4A0000000") => Json(serde_json::json!({
            "count": 0,
            "next": null,
            "previous": null,
            "results": []
        }))
        .into_response(),
        ("gas-meter-points", "9000000000", "BROKEN") => "not json".into_response(),
        ("gas-meter-points", "9000000000", "OUTAGE") => {
            (StatusCode::BAD_GATEWAY, "<html>".repeat(5_000)).into_response()
        }
        _ => (StatusCode::NOT_FOUND, r#"{"detail":"Not found."}"#).into_response(),
    }
}

async fn spawn_fake_api() -> SocketAddr {
    let app = Router::new().route("/:kind/:point/meters/:meter/consumption/", get(consumption));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, key: &str) -> OctopusClient {
    OctopusClient::new(&format!("http://{addr}"), key, Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn latest_electricity_reading_is_fetched_with_basic_auth() {
    let addr = spawn_fake_api().await;
    let app_client = client(addr, "sk_test_key");

    let reading = app_client
        .latest_consumption(&MeterPoint::electricity("1200000000000", "21L0000000"))
        .await
        .unwrap()
        .expect("a reading");

    assert_eq!(reading.point_type, PointType::Electricity);
    assert_eq!(reading.consumption_kwh, 0.318);
    assert_eq!(reading.interval_secs, 1800.0);
    assert_eq!(reading.ts, datetime!(2024-03-10 12:15:00 UTC));
}

#[tokio::test]
async fn empty_results_yield_none() {
    let addr = spawn_fake_api().await;
    let app_client = client(addr, "sk_test_key");

    let reading = app_client
        .latest_consumption(&MeterPoint::gas("9000000000", "G4A0000000"))
        .await
        .unwrap();

    assert!(reading.is_none());
}

#[tokio::test]
async fn rejected_credentials_surface_as_status_error() {
    let addr = spawn_fake_api().await;
    let app_client = client(addr, "wrong");

    let err = app_client
        .latest_consumption(&MeterPoint::electricity("1200000000000", "21L0000000"))
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
            assert!(body.contains("Authentication failed"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_meter_surfaces_as_status_error() {
    let addr = spawn_fake_api().await;

    let err = client(addr, "sk_test_key")
        .latest_consumption(&MeterPoint::electricity("1200000000000", "NOPE"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status, .. } if status == reqwest::StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let addr = spawn_fake_api().await;

    let err = client(addr, "sk_test_key")
        .latest_consumption(&MeterPoint::gas("9000000000", "BROKEN"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn unreachable_upstream_is_an_http_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, "sk_test_key")
        .latest_consumption(&MeterPoint::electricity("1200000000000", "21L0000000"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Http(_)));
}

#[tokio::test]
async fn large_error_page_is_cut_short() {
    let addr = spawn_fake_api().await;

    let err = client(addr, "sk_test_key")
        .latest_consumption(&MeterPoint::gas("9000000000", "OUTAGE"))
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
            assert!(body.starts_with("<html>"));
            assert!(body.ends_with("..."));
            assert!(body.len() < 1024, "body was {} bytes", body.len());
        }
        other => panic!("expected status error, got {other:?}"),
    }
}
