//! Behaviour tests for the visiting-order optimizer.

use fieldroute_core::test_support::PlanarSource;
use fieldroute_core::{Coordinate, RouteError, RouteOptions, RouteStop};
use fieldroute_solver::RouteOptimizer;

fn coordinate(lat: f64, lng: f64) -> Coordinate {
    Coordinate::new(lat, lng).expect("valid test coordinate")
}

fn stop(reference: &str, lat: f64, lng: f64) -> RouteStop {
    RouteStop::new(reference.to_owned(), coordinate(lat, lng))
}

fn visiting_order(stops: &[RouteStop]) -> Vec<&str> {
    stops.iter().map(|s| s.reference.as_str()).collect()
}

#[tokio::test]
async fn an_empty_stop_set_is_rejected() {
    let optimizer = RouteOptimizer::new(PlanarSource::new());
    let error = optimizer
        .optimize(&[], coordinate(0.0, 0.0), &RouteOptions::default())
        .await
        .expect_err("nothing to optimise");
    assert!(matches!(error, RouteError::InvalidInput(_)));
}

#[tokio::test]
async fn a_single_stop_yields_one_leg() {
    let optimizer = RouteOptimizer::new(PlanarSource::new());
    let solution = optimizer
        .optimize(
            &[stop("only", 0.0, 1.0)],
            coordinate(0.0, 0.0),
            &RouteOptions::default(),
        )
        .await
        .expect("trivial route");

    assert_eq!(solution.segments.len(), 1);
    assert_eq!(visiting_order(&solution.stops), vec!["only"]);
    // One degree of longitude is 100 km on the test plane.
    assert!((solution.total_distance_km - 100.0).abs() < 0.1);
}

#[tokio::test]
async fn exact_search_finds_the_shortest_tour() {
    let optimizer = RouteOptimizer::new(PlanarSource::new());
    // Stops on a line, given out of order; the only optimal open tour from
    // the origin visits them by increasing longitude.
    let stops = vec![
        stop("far", 0.0, 3.0),
        stop("near", 0.0, 1.0),
        stop("middle", 0.0, 2.0),
    ];
    let solution = optimizer
        .optimize(&stops, coordinate(0.0, 0.0), &RouteOptions::default())
        .await
        .expect("solvable tour");

    assert_eq!(visiting_order(&solution.stops), vec!["near", "middle", "far"]);
    assert!((solution.total_distance_km - 300.0).abs() < 0.1);
}

#[tokio::test]
async fn stops_sharing_an_address_are_each_visited() {
    let optimizer = RouteOptimizer::new(PlanarSource::new());
    // Two jobs at one address are ordinary input; the exact search must
    // still produce a complete tour with a zero-length leg between them.
    let stops = vec![
        stop("job-far", 0.0, 2.0),
        stop("job-a", 0.0, 1.0),
        stop("job-b", 0.0, 1.0),
    ];
    let solution = optimizer
        .optimize(&stops, coordinate(0.0, 0.0), &RouteOptions::default())
        .await
        .expect("duplicate-location stops are valid input");

    let mut order = visiting_order(&solution.stops);
    assert_eq!(solution.segments.len(), 3);
    assert!(
        solution
            .segments
            .iter()
            .any(|leg| leg.distance_meters.abs() < f64::EPSILON),
        "the co-located pair shares a zero-length leg"
    );
    order.sort_unstable();
    assert_eq!(order, vec!["job-a", "job-b", "job-far"]);
    assert!((solution.total_distance_km - 200.0).abs() < 0.1);
}

#[tokio::test]
async fn a_round_trip_closes_back_at_the_start() {
    let optimizer = RouteOptimizer::new(PlanarSource::new());
    let stops = vec![
        stop("a", 0.0, 1.0),
        stop("b", 1.0, 1.0),
        stop("c", 1.0, 0.0),
        stop("d", 0.5, 0.5),
    ];
    let start = coordinate(0.0, 0.0);
    let solution = optimizer
        .optimize(&stops, start, &RouteOptions::default().round_trip())
        .await
        .expect("solvable round trip");

    assert_eq!(solution.segments.len(), 5);
    let first = solution.segments.first().expect("five legs");
    let last = solution.segments.last().expect("five legs");
    assert_eq!(first.from, start);
    assert_eq!(last.to, start);
    assert!(last.is_return);
    assert!(solution.segments.iter().take(4).all(|leg| !leg.is_return));
}

#[tokio::test]
async fn a_distinct_end_point_is_honoured() {
    let optimizer = RouteOptimizer::new(PlanarSource::new());
    let stops = vec![stop("a", 0.0, 1.0), stop("b", 0.0, 2.0)];
    let end = coordinate(0.0, 5.0);
    let solution = optimizer
        .optimize(
            &stops,
            coordinate(0.0, 0.0),
            &RouteOptions::default().ending_at(end),
        )
        .await
        .expect("solvable open tour");

    let last = solution.segments.last().expect("three legs");
    assert_eq!(last.to, end);
    assert!(!last.is_return);
}

#[tokio::test]
async fn greedy_search_covers_every_stop_exactly_once() {
    let optimizer = RouteOptimizer::new(PlanarSource::new());
    // Seven stops forces the greedy path; on a line the nearest-neighbour
    // tour is the sorted walk.
    let stops = vec![
        stop("s4", 0.0, 4.0),
        stop("s1", 0.0, 1.0),
        stop("s6", 0.0, 6.0),
        stop("s2", 0.0, 2.0),
        stop("s7", 0.0, 7.0),
        stop("s3", 0.0, 3.0),
        stop("s5", 0.0, 5.0),
    ];
    let solution = optimizer
        .optimize(&stops, coordinate(0.0, 0.0), &RouteOptions::default())
        .await
        .expect("solvable tour");

    assert_eq!(
        visiting_order(&solution.stops),
        vec!["s1", "s2", "s3", "s4", "s5", "s6", "s7"]
    );
    assert_eq!(solution.segments.len(), 7);
}

#[tokio::test]
async fn an_unreachable_edge_names_the_offending_pair() {
    let start = coordinate(0.0, 0.0);
    let cut_off = coordinate(0.0, 2.0);
    let source = PlanarSource::new()
        .with_unreachable(start, cut_off)
        .with_unreachable(coordinate(0.0, 1.0), cut_off);
    let optimizer = RouteOptimizer::new(source);
    let stops = vec![stop("a", 0.0, 1.0), stop("b", 0.0, 2.0)];

    let error = optimizer
        .optimize(&stops, start, &RouteOptions::default())
        .await
        .expect_err("edge into the cut-off stop is unroutable");

    match error {
        RouteError::Unavailable { to, .. } => assert_eq!(to, cut_off),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn the_memo_bounds_distance_layer_traffic() {
    let optimizer = RouteOptimizer::new(PlanarSource::new());
    let stops = vec![
        stop("a", 0.0, 1.0),
        stop("b", 1.0, 1.0),
        stop("c", 1.0, 0.0),
        stop("d", 0.5, 0.5),
    ];
    let solution = optimizer
        .optimize(
            &stops,
            coordinate(0.0, 0.0),
            &RouteOptions::default().round_trip(),
        )
        .await
        .expect("solvable round trip");
    assert_eq!(solution.stops.len(), 4);

    // Unique directed edges for a 4-stop round trip: 4 from the start,
    // 4x3 between stops, 4 back to the start. All 24 permutations replay
    // them from the memo.
    assert_eq!(optimizer.source().calls(), 20);
}
