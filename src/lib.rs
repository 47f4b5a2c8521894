//! Facade crate for the fieldroute distance engine.
//!
//! This crate re-exports the core domain types and exposes the provider
//! adapters, durable stores, orchestration service, and route optimizer
//! behind feature flags.

#![forbid(unsafe_code)]

pub use fieldroute_core::{
    BatchLimits, CacheEntry, ConnectionStatus, Coordinate, DistanceCache, DistanceError,
    DistanceMatrix, DistanceOptions, DistanceProvider, DistanceResult, DistanceSource, MatrixCell,
    Objective, ProviderId, QuotaCounter, QuotaStore, RouteError, RouteOptions, RouteSegment,
    RouteSolution, RouteStop, SelectionStrategy, TrafficModel, TravelMode, VolatilityClass,
};

#[cfg(feature = "providers")]
pub use fieldroute_providers::{
    ApproximationConfig, ApproximationProvider, MatrixApiConfig, MatrixApiProvider, OsrmConfig,
    OsrmProvider, RetryPolicy,
};

#[cfg(feature = "store-sqlite")]
pub use fieldroute_store::{
    CacheTtls, MemoryDistanceCache, MemoryQuotaStore, SqliteDistanceCache, SqliteQuotaStore,
    StoreError, TieredDistanceCache,
};

#[cfg(feature = "service")]
pub use fieldroute_service::{
    BatchReport, DailyLimits, DistanceService, EngineConfig, EnrichedTarget, FallbackManager,
    ProviderProbe,
};

#[cfg(feature = "solver")]
pub use fieldroute_solver::{EXACT_SEARCH_LIMIT, RouteOptimizer};
