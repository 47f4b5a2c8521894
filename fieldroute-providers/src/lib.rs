//! Provider adapters for the Fieldroute distance engine.
//!
//! Three implementations of [`fieldroute_core::DistanceProvider`]:
//!
//! - [`OsrmProvider`] — free road routing against an OSRM instance
//!   (`route` service for single pairs, `table` for matrices), with bounded
//!   exponential backoff on transient transport failures.
//! - [`MatrixApiProvider`] — commercial traffic-aware distance-matrix API
//!   behind an API key, with hard batch caps enforced at this layer.
//! - [`ApproximationProvider`] — zero-network haversine approximation with
//!   a city/intercity road-shape multiplier and class average speeds.
//!
//! All adapters validate coordinates before use and translate failures into
//! the shared [`fieldroute_core::DistanceError`] taxonomy. Retries never
//! cross a provider boundary; falling back to another provider is the
//! fallback manager's job.

#![forbid(unsafe_code)]

mod approximation;
mod matrix_api;
mod osrm;
mod retry;

pub use approximation::{ApproximationConfig, ApproximationProvider};
pub use matrix_api::{MatrixApiConfig, MatrixApiProvider};
pub use osrm::{DEFAULT_USER_AGENT, OsrmConfig, OsrmProvider};
pub use retry::RetryPolicy;

use fieldroute_core::{Coordinate, DistanceError};

/// Re-validate a coordinate at the adapter boundary.
///
/// `Coordinate` fields are public, so adapters re-check ranges rather than
/// trusting every caller to have gone through the validating constructor.
fn validated(coordinate: Coordinate) -> Result<Coordinate, DistanceError> {
    Coordinate::new(coordinate.lat, coordinate.lng)
}
