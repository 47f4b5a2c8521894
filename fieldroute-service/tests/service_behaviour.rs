//! Behaviour tests for fallback, quota enforcement, and orchestration.

use std::sync::Arc;

use chrono::Utc;

use fieldroute_core::test_support::ScriptedProvider;
use fieldroute_core::{
    BatchLimits, Coordinate, DistanceCache, DistanceError, DistanceOptions, DistanceProvider,
    DistanceResult, DistanceSource, MatrixCell, ProviderId, QuotaStore, SelectionStrategy,
    VolatilityClass,
};
use fieldroute_service::{DailyLimits, DistanceService, EngineConfig};
use fieldroute_store::{MemoryDistanceCache, MemoryQuotaStore};

fn coordinate(lat: f64, lng: f64) -> Coordinate {
    Coordinate::new(lat, lng).expect("valid test coordinate")
}

fn road(provider: ProviderId, meters: f64) -> DistanceResult {
    DistanceResult::new(meters, 60.0, provider, 0)
}

struct Harness {
    service: DistanceService,
    cache: Arc<MemoryDistanceCache>,
    quota: Arc<MemoryQuotaStore>,
}

fn harness(providers: Vec<Arc<ScriptedProvider>>, config: EngineConfig) -> Harness {
    let cache = Arc::new(MemoryDistanceCache::new());
    let quota = Arc::new(MemoryQuotaStore::new());
    let providers = providers
        .into_iter()
        .map(|provider| provider as Arc<dyn DistanceProvider>)
        .collect();
    let service = DistanceService::new(
        providers,
        Arc::clone(&cache) as Arc<dyn DistanceCache>,
        Arc::clone(&quota) as Arc<dyn QuotaStore>,
        config,
    );
    Harness {
        service,
        cache,
        quota,
    }
}

fn quiet_config() -> EngineConfig {
    EngineConfig::default().without_pacing()
}

#[tokio::test]
async fn cost_optimized_asks_the_free_provider_first() {
    let osrm = Arc::new(ScriptedProvider::succeeding(
        ProviderId::OsrmRouting,
        road(ProviderId::OsrmRouting, 1_000.0),
    ));
    let matrix_api = Arc::new(ScriptedProvider::succeeding(
        ProviderId::MatrixApi,
        road(ProviderId::MatrixApi, 1_000.0),
    ));
    let fixture = harness(vec![Arc::clone(&osrm), Arc::clone(&matrix_api)], quiet_config());

    let result = fixture
        .service
        .distance(coordinate(50.0, 19.0), coordinate(52.0, 21.0), &DistanceOptions::default())
        .await
        .expect("free provider answers");

    assert_eq!(result.provider, ProviderId::OsrmRouting);
    assert_eq!(osrm.calls(), 1);
    assert_eq!(matrix_api.calls(), 0);
}

#[tokio::test]
async fn per_call_strategy_override_prefers_the_paid_provider() {
    let osrm = Arc::new(ScriptedProvider::succeeding(
        ProviderId::OsrmRouting,
        road(ProviderId::OsrmRouting, 1_000.0),
    ));
    let matrix_api = Arc::new(ScriptedProvider::succeeding(
        ProviderId::MatrixApi,
        road(ProviderId::MatrixApi, 1_000.0),
    ));
    let fixture = harness(vec![Arc::clone(&osrm), Arc::clone(&matrix_api)], quiet_config());
    let options = DistanceOptions::default().with_strategy(SelectionStrategy::QualityOptimized);

    let result = fixture
        .service
        .distance(coordinate(50.0, 19.0), coordinate(52.0, 21.0), &options)
        .await
        .expect("paid provider answers");

    assert_eq!(result.provider, ProviderId::MatrixApi);
    assert_eq!(osrm.calls(), 0);
}

#[tokio::test]
async fn a_failing_provider_falls_through_to_the_next() {
    let osrm = Arc::new(ScriptedProvider::failing(ProviderId::OsrmRouting));
    let matrix_api = Arc::new(ScriptedProvider::succeeding(
        ProviderId::MatrixApi,
        road(ProviderId::MatrixApi, 2_000.0),
    ));
    let fixture = harness(vec![Arc::clone(&osrm), Arc::clone(&matrix_api)], quiet_config());

    let result = fixture
        .service
        .distance(coordinate(50.0, 19.0), coordinate(52.0, 21.0), &DistanceOptions::default())
        .await
        .expect("fallback succeeds");

    assert_eq!(result.provider, ProviderId::MatrixApi);
    assert_eq!(osrm.calls(), 1);
}

#[tokio::test]
async fn a_cache_hit_never_reaches_a_provider() {
    let osrm = Arc::new(ScriptedProvider::succeeding(
        ProviderId::OsrmRouting,
        road(ProviderId::OsrmRouting, 1_000.0),
    ));
    let fixture = harness(vec![Arc::clone(&osrm)], quiet_config());
    let origin = coordinate(50.0, 19.0);
    let destination = coordinate(52.0, 21.0);
    let options = DistanceOptions::default();

    for _ in 0..3 {
        fixture
            .service
            .distance(origin, destination, &options)
            .await
            .expect("resolves");
    }

    assert_eq!(osrm.calls(), 1);
}

#[tokio::test]
async fn an_exhausted_provider_is_skipped_without_an_attempt() {
    let osrm = Arc::new(ScriptedProvider::succeeding(
        ProviderId::OsrmRouting,
        road(ProviderId::OsrmRouting, 1_000.0),
    ));
    let matrix_api = Arc::new(ScriptedProvider::succeeding(
        ProviderId::MatrixApi,
        road(ProviderId::MatrixApi, 1_000.0),
    ));
    let config = quiet_config().with_daily_limits(DailyLimits {
        osrm_routing: 1,
        matrix_api: 0,
    });
    let fixture = harness(vec![Arc::clone(&osrm), Arc::clone(&matrix_api)], config);
    let options = DistanceOptions::default();

    fixture
        .service
        .distance(coordinate(50.0, 19.0), coordinate(52.0, 21.0), &options)
        .await
        .expect("first call fits the quota");
    let second = fixture
        .service
        .distance(coordinate(51.0, 19.0), coordinate(53.0, 21.0), &options)
        .await
        .expect("second call falls through");

    assert_eq!(second.provider, ProviderId::MatrixApi);
    assert_eq!(osrm.calls(), 1);
}

#[tokio::test]
async fn total_exhaustion_reports_every_attempt_and_the_last_error() {
    let osrm = Arc::new(ScriptedProvider::failing(ProviderId::OsrmRouting));
    let matrix_api = Arc::new(ScriptedProvider::failing(ProviderId::MatrixApi));
    let fixture = harness(vec![osrm, matrix_api], quiet_config());

    let error = fixture
        .service
        .distance(coordinate(50.0, 19.0), coordinate(52.0, 21.0), &DistanceOptions::default())
        .await
        .expect_err("nothing can answer");

    match error {
        DistanceError::AllProvidersFailed { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last, DistanceError::Network { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    let today = Utc::now().date_naive();
    assert_eq!(
        fixture.quota.usage(ProviderId::OsrmRouting, today).failure_count,
        1
    );
    assert_eq!(
        fixture.quota.usage(ProviderId::MatrixApi, today).failure_count,
        1
    );
}

#[tokio::test]
async fn oversized_matrices_are_chunked_and_stitched() {
    let provider = Arc::new(
        ScriptedProvider::succeeding(
            ProviderId::OsrmRouting,
            road(ProviderId::OsrmRouting, 5_000.0),
        )
        .with_limits(BatchLimits::new(2, 2)),
    );
    let fixture = harness(vec![Arc::clone(&provider)], quiet_config());
    let points: Vec<Coordinate> = (0..3).map(|i| coordinate(50.0 + f64::from(i), 19.0)).collect();

    let matrix = fixture
        .service
        .matrix(&points, &points, &DistanceOptions::default())
        .await;

    // 3x3 against 2x2 caps splits into four sub-grids.
    assert_eq!(provider.matrix_calls(), 4);
    assert_eq!(matrix.resolved_count(), 9);
}

#[tokio::test]
async fn a_failed_sub_grid_poisons_only_its_own_cells() {
    let ok = road(ProviderId::OsrmRouting, 5_000.0);
    let provider = Arc::new(
        ScriptedProvider::succeeding(ProviderId::OsrmRouting, ok.clone())
            .with_limits(BatchLimits::new(2, 2))
            .with_outcomes(vec![
                Ok(ok.clone()),
                Ok(ok.clone()),
                Ok(ok.clone()),
                Ok(ok),
                Err(DistanceError::Network {
                    provider: ProviderId::OsrmRouting,
                    message: "mid-batch outage".to_owned(),
                }),
            ]),
    );
    let fixture = harness(vec![Arc::clone(&provider)], quiet_config());
    let points: Vec<Coordinate> = (0..3).map(|i| coordinate(50.0 + f64::from(i), 19.0)).collect();

    let matrix = fixture
        .service
        .matrix(&points, &points, &DistanceOptions::default())
        .await;

    // The second sub-grid (rows 0-1, column 2) failed; everything else
    // resolved.
    assert_eq!(matrix.resolved_count(), 7);
    assert!(matches!(matrix.cell(0, 2), Some(MatrixCell::Failed(_))));
    assert!(matches!(matrix.cell(1, 2), Some(MatrixCell::Failed(_))));
    assert!(matches!(matrix.cell(2, 2), Some(MatrixCell::Ok(_))));
}

#[tokio::test]
async fn cached_pairs_merge_positionally_with_fresh_cells() {
    let provider = Arc::new(ScriptedProvider::succeeding(
        ProviderId::OsrmRouting,
        road(ProviderId::OsrmRouting, 5_000.0),
    ));
    let fixture = harness(vec![Arc::clone(&provider)], quiet_config());
    let origins = vec![coordinate(50.0, 19.0), coordinate(51.0, 19.0)];
    let destinations = vec![coordinate(52.0, 21.0), coordinate(53.0, 21.0)];
    let options = DistanceOptions::default();

    // The whole first row is cached, so the misses fill their covering
    // grid exactly and batch as a single sub-matrix.
    let cached = road(ProviderId::OsrmRouting, 111.0);
    fixture.cache.put(
        coordinate(50.0, 19.0),
        coordinate(52.0, 21.0),
        &options,
        &cached,
        VolatilityClass::Static,
    );
    fixture.cache.put(
        coordinate(50.0, 19.0),
        coordinate(53.0, 21.0),
        &options,
        &road(ProviderId::OsrmRouting, 222.0),
        VolatilityClass::Static,
    );

    let matrix = fixture
        .service
        .matrix_with_cache(&origins, &destinations, &options)
        .await;

    assert_eq!(matrix.resolved_count(), 4);
    assert_eq!(provider.matrix_calls(), 1);
    let hit = matrix
        .cell(0, 0)
        .and_then(MatrixCell::as_result)
        .expect("cached cell");
    assert!((hit.distance_meters - 111.0).abs() < f64::EPSILON);

    // Fresh cells were written back; a second pass is all cache.
    fixture
        .service
        .matrix_with_cache(&origins, &destinations, &options)
        .await;
    assert_eq!(provider.matrix_calls(), 1);
}

#[tokio::test]
async fn a_cached_pair_spends_no_quota_in_a_partial_matrix() {
    let provider = Arc::new(ScriptedProvider::succeeding(
        ProviderId::OsrmRouting,
        road(ProviderId::OsrmRouting, 5_000.0),
    ));
    let fixture = harness(vec![Arc::clone(&provider)], quiet_config());
    let origins = vec![coordinate(50.0, 19.0), coordinate(51.0, 19.0)];
    let destinations = vec![coordinate(52.0, 21.0), coordinate(53.0, 21.0)];
    let options = DistanceOptions::default();

    fixture.cache.put(
        coordinate(50.0, 19.0),
        coordinate(52.0, 21.0),
        &options,
        &road(ProviderId::OsrmRouting, 111.0),
        VolatilityClass::Static,
    );

    // One cached corner makes the misses sparse: a covering grid would
    // drag the cached pair back through the provider, so each miss must
    // resolve individually instead.
    let matrix = fixture
        .service
        .matrix_with_cache(&origins, &destinations, &options)
        .await;

    assert_eq!(matrix.resolved_count(), 4);
    assert_eq!(provider.matrix_calls(), 0);
    assert_eq!(provider.calls(), 3);
    let today = Utc::now().date_naive();
    assert_eq!(
        fixture.quota.usage(ProviderId::OsrmRouting, today).request_count,
        3
    );

    // Per-pair resolution caches as it goes; a second pass is free.
    fixture
        .service
        .matrix_with_cache(&origins, &destinations, &options)
        .await;
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn batch_enrichment_degrades_failures_to_the_sentinel() {
    let ok = road(ProviderId::OsrmRouting, 300.0);
    let provider = Arc::new(
        ScriptedProvider::succeeding(ProviderId::OsrmRouting, ok.clone()).with_outcomes(vec![
            Ok(ok.clone()),
            Err(DistanceError::NoRoute {
                from: coordinate(50.0, 19.0),
                to: coordinate(51.0, 19.0),
            }),
            Ok(ok),
        ]),
    );
    let fixture = harness(vec![provider], quiet_config());
    let targets = vec![
        coordinate(50.5, 19.0),
        coordinate(51.0, 19.0),
        coordinate(51.5, 19.0),
    ];

    let report = fixture
        .service
        .distances_from(coordinate(50.0, 19.0), &targets, &DistanceOptions::default())
        .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.items.len(), 3);
    let degraded = report.items.get(1).expect("three items");
    assert!(degraded.distance_meters.is_infinite());
    assert!(!degraded.is_reachable());
}

#[tokio::test]
async fn sorting_places_unreachable_items_last_and_is_stable() {
    let provider = Arc::new(
        ScriptedProvider::succeeding(
            ProviderId::OsrmRouting,
            road(ProviderId::OsrmRouting, 100.0),
        )
        .with_outcomes(vec![
            Ok(road(ProviderId::OsrmRouting, 300.0)),
            Ok(road(ProviderId::OsrmRouting, 100.0)),
            Err(DistanceError::Network {
                provider: ProviderId::OsrmRouting,
                message: "unroutable".to_owned(),
            }),
            Ok(road(ProviderId::OsrmRouting, 100.0)),
        ]),
    );
    let fixture = harness(vec![provider], quiet_config());
    let far = coordinate(53.0, 21.0);
    let near_first = coordinate(51.0, 19.0);
    let lost = coordinate(52.0, 20.0);
    let near_second = coordinate(51.5, 19.5);

    let sorted = fixture
        .service
        .sort_by_distance(
            coordinate(50.0, 19.0),
            &[far, near_first, lost, near_second],
            &DistanceOptions::default(),
        )
        .await;

    let order: Vec<Coordinate> = sorted.iter().map(|item| item.target).collect();
    assert_eq!(order, vec![near_first, near_second, far, lost]);
    assert!(sorted.last().expect("four items").distance_meters.is_infinite());
}
