//! Behaviour tests verifying durable state survives process restarts.

use chrono::{Duration, NaiveDate};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use fieldroute_core::{
    Coordinate, DistanceCache, DistanceOptions, DistanceResult, ProviderId, QuotaStore,
    VolatilityClass,
};
use fieldroute_store::{
    CacheTtls, MemoryDistanceCache, SqliteDistanceCache, SqliteQuotaStore, TieredDistanceCache,
};

#[fixture]
fn workdir() -> TempDir {
    tempfile::tempdir().expect("create temporary directory")
}

fn krakow() -> Coordinate {
    Coordinate::new(50.0647, 19.9450).expect("valid coordinate")
}

fn warsaw() -> Coordinate {
    Coordinate::new(52.2297, 21.0122).expect("valid coordinate")
}

fn road_result() -> DistanceResult {
    DistanceResult::new(253_400.0, 9_960.0, ProviderId::OsrmRouting, 0)
}

#[rstest]
fn cached_distances_survive_reopen(workdir: TempDir) {
    let path = workdir.path().join("cache.db");
    let options = DistanceOptions::default();

    let cache = SqliteDistanceCache::open(&path, CacheTtls::default()).expect("open cache");
    cache.put(
        krakow(),
        warsaw(),
        &options,
        &road_result(),
        VolatilityClass::Static,
    );
    drop(cache);

    let reopened = SqliteDistanceCache::open(&path, CacheTtls::default()).expect("reopen cache");
    let hit = reopened
        .get(krakow(), warsaw(), &options)
        .expect("entry survives reopen");
    assert_eq!(hit.provider, ProviderId::OsrmRouting);
    assert!((hit.distance_meters - 253_400.0).abs() < f64::EPSILON);
}

#[rstest]
fn expired_rows_are_misses_and_purgeable(workdir: TempDir) {
    let path = workdir.path().join("cache.db");
    let options = DistanceOptions::default();
    let already_expired = CacheTtls {
        static_ttl: Duration::seconds(-1),
        traffic_ttl: Duration::seconds(-1),
    };

    let cache = SqliteDistanceCache::open(&path, already_expired).expect("open cache");
    cache.put(
        krakow(),
        warsaw(),
        &options,
        &road_result(),
        VolatilityClass::Static,
    );
    assert_eq!(cache.len(), 1);
    assert!(cache.get(krakow(), warsaw(), &options).is_none());
    // The expired row was dropped on access.
    assert!(cache.is_empty());

    cache.put(
        krakow(),
        warsaw(),
        &options,
        &road_result(),
        VolatilityClass::Traffic,
    );
    assert_eq!(cache.purge_expired(), 1);
    assert!(cache.is_empty());
}

#[rstest]
fn durable_hits_repopulate_the_memory_tier(workdir: TempDir) {
    let path = workdir.path().join("cache.db");
    let options = DistanceOptions::default();

    let first = TieredDistanceCache::new(
        MemoryDistanceCache::new(),
        SqliteDistanceCache::open(&path, CacheTtls::default()).expect("open cache"),
    );
    first.put(
        krakow(),
        warsaw(),
        &options,
        &road_result(),
        VolatilityClass::Static,
    );
    drop(first);

    // Fresh process: the memory tier starts cold.
    let second = TieredDistanceCache::new(
        MemoryDistanceCache::new(),
        SqliteDistanceCache::open(&path, CacheTtls::default()).expect("reopen cache"),
    );
    assert_eq!(second.memory_len(), 0);
    assert!(second.get(krakow(), warsaw(), &options).is_some());
    assert_eq!(second.memory_len(), 1);
}

#[rstest]
fn quota_counters_survive_reopen(workdir: TempDir) {
    let path = workdir.path().join("quota.db");
    let june_first = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");

    let store = SqliteQuotaStore::open(&path).expect("open quota store");
    store.record_success(ProviderId::MatrixApi, june_first);
    store.record_success(ProviderId::MatrixApi, june_first);
    store.record_failure(ProviderId::MatrixApi, june_first);
    drop(store);

    let reopened = SqliteQuotaStore::open(&path).expect("reopen quota store");
    let usage = reopened.usage(ProviderId::MatrixApi, june_first);
    assert_eq!(usage.request_count, 2);
    assert_eq!(usage.failure_count, 1);
}

#[rstest]
fn historical_days_aggregate_over_ranges(workdir: TempDir) {
    let path = workdir.path().join("quota.db");
    let store = SqliteQuotaStore::open(&path).expect("open quota store");
    for day in 1..=3u32 {
        let date = NaiveDate::from_ymd_opt(2025, 6, day).expect("valid date");
        store.record_success(ProviderId::OsrmRouting, date);
        store.record_success(ProviderId::OsrmRouting, date);
    }
    let outside = NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date");
    store.record_success(ProviderId::OsrmRouting, outside);
    // A different provider in the same window must not leak in.
    store.record_success(
        ProviderId::MatrixApi,
        NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date"),
    );

    let from = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");
    let to = NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date");
    assert_eq!(store.usage_between(ProviderId::OsrmRouting, from, to), (6, 0));
}
