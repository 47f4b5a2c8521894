//! Integration tests for the OSRM adapter against a mock HTTP server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fieldroute_core::{
    Coordinate, DistanceError, DistanceOptions, DistanceProvider, MatrixCell, ProviderId,
};
use fieldroute_providers::{OsrmConfig, OsrmProvider, RetryPolicy};

fn coordinate(lat: f64, lng: f64) -> Coordinate {
    Coordinate::new(lat, lng).expect("valid test coordinate")
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
    }
}

fn provider_for(server: &MockServer) -> OsrmProvider {
    OsrmProvider::with_config(OsrmConfig::new(server.uri()).with_retry(fast_retry()))
        .expect("client should build")
}

#[tokio::test]
async fn single_pair_resolves_through_route_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/route/v1/driving/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "Ok",
            "routes": [{"distance": 253_400.0, "duration": 11_520.0}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let result = provider
        .distance(
            coordinate(50.0647, 19.9450),
            coordinate(52.2297, 21.0122),
            &DistanceOptions::default(),
        )
        .await
        .expect("route should resolve");

    assert_eq!(result.distance_meters, 253_400.0);
    assert_eq!(result.duration_seconds, 11_520.0);
    assert_eq!(result.provider, ProviderId::OsrmRouting);
    assert_eq!(result.cost_units, 0);
    assert!(result.duration_in_traffic_seconds.is_none());
}

#[tokio::test]
async fn transient_server_errors_are_retried_then_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/route/v1/.*"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/route/v1/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "Ok",
            "routes": [{"distance": 1000.0, "duration": 90.0}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let result = provider
        .distance(
            coordinate(50.0, 19.0),
            coordinate(50.1, 19.1),
            &DistanceOptions::default(),
        )
        .await
        .expect("third attempt should succeed");

    assert_eq!(result.distance_meters, 1000.0);
    assert_eq!(server.received_requests().await.map_or(0, |r| r.len()), 3);
}

#[tokio::test]
async fn retry_budget_exhaustion_surfaces_the_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/route/v1/.*"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let error = provider
        .distance(
            coordinate(50.0, 19.0),
            coordinate(50.1, 19.1),
            &DistanceOptions::default(),
        )
        .await
        .expect_err("all attempts fail");

    assert!(matches!(error, DistanceError::Network { provider: ProviderId::OsrmRouting, .. }));
}

#[tokio::test]
async fn no_route_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/route/v1/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "NoRoute",
            "message": "Impossible route between points"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let error = provider
        .distance(
            coordinate(50.0, 19.0),
            coordinate(-50.0, -19.0),
            &DistanceOptions::default(),
        )
        .await
        .expect_err("no route exists");

    assert!(matches!(error, DistanceError::NoRoute { .. }));
}

#[tokio::test]
async fn table_service_builds_a_full_matrix_with_unreachable_cells() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/table/v1/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "Ok",
            "durations": [[60.0, null], [120.0, 180.0]],
            "distances": [[900.0, null], [1800.0, 2700.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let origins = vec![coordinate(50.0, 19.0), coordinate(50.1, 19.1)];
    let destinations = vec![coordinate(50.2, 19.2), coordinate(50.3, 19.3)];
    let matrix = provider
        .distance_matrix(&origins, &destinations, &DistanceOptions::default())
        .await
        .expect("table should resolve");

    assert_eq!(matrix.resolved_count(), 3);
    assert_eq!(matrix.cell(0, 1), Some(&MatrixCell::Unreachable));
    let cell = matrix.cell(1, 1).and_then(MatrixCell::as_result);
    assert_eq!(cell.map(|r| r.distance_meters), Some(2700.0));
}

#[tokio::test]
async fn oversized_table_requests_never_reach_the_wire() {
    let server = MockServer::start().await;
    let provider = OsrmProvider::with_config(
        OsrmConfig::new(server.uri())
            .with_retry(fast_retry())
            .with_batch_limits(fieldroute_core::BatchLimits::new(2, 2)),
    )
    .expect("client should build");

    let origins = vec![coordinate(50.0, 19.0), coordinate(50.1, 19.1), coordinate(50.2, 19.2)];
    let destinations = vec![coordinate(51.0, 20.0)];
    let error = provider
        .distance_matrix(&origins, &destinations, &DistanceOptions::default())
        .await
        .expect_err("exceeds caps");

    assert!(matches!(error, DistanceError::InvalidInput(_)));
    assert_eq!(server.received_requests().await.map_or(0, |r| r.len()), 0);
}
