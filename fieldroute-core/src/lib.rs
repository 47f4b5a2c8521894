//! Core domain types and seams for the Fieldroute distance engine.
//!
//! These models provide basic validation to keep downstream components
//! honest. Constructors return `Result` to surface invalid input early.
//! The traits in this crate are the engine's seams: provider adapters,
//! cache tiers, quota counters, and the distance source consumed by the
//! route solver all plug in behind them.

#![forbid(unsafe_code)]

mod cache;
mod coordinate;
mod error;
mod matrix;
mod options;
mod provider;
mod quota;
mod result;
mod route;
mod source;

#[doc(hidden)]
pub mod test_support;

pub use cache::{CacheEntry, DistanceCache, VolatilityClass, cache_key};
pub use coordinate::Coordinate;
pub use error::DistanceError;
pub use matrix::{DistanceMatrix, MatrixCell};
pub use options::{DistanceOptions, SelectionStrategy, TrafficModel, TravelMode};
pub use provider::{BatchLimits, ConnectionStatus, DistanceProvider, ProviderId};
pub use quota::{QuotaCounter, QuotaStore};
pub use result::{DistanceResult, format_distance, format_duration};
pub use route::{Objective, RouteError, RouteOptions, RouteSegment, RouteSolution, RouteStop};
pub use source::DistanceSource;
