//! Route stops, segments, and solved routes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Coordinate, DistanceError, format_distance, format_duration};

/// A caller-supplied stop: a coordinate plus an opaque business reference.
///
/// The optimizer reorders stops but never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    /// Opaque reference owned by the business layer (order id, client id…).
    pub reference: String,
    /// Where the stop is.
    pub location: Coordinate,
}

impl RouteStop {
    /// Construct a stop.
    #[must_use]
    pub const fn new(reference: String, location: Coordinate) -> Self {
        Self {
            reference,
            location,
        }
    }
}

/// Objective the optimizer minimises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Minimise total distance in metres.
    #[default]
    Shortest,
    /// Minimise total travel time (traffic-aware when available).
    Fastest,
}

/// Options for a route optimisation request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteOptions {
    /// What to minimise.
    pub objective: Objective,
    /// Close the tour back to the start.
    pub return_to_start: bool,
    /// Optional distinct end point; ignored when `return_to_start` is set.
    pub end: Option<Coordinate>,
}

impl RouteOptions {
    /// Set the objective.
    #[must_use]
    pub const fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    /// Request a round trip back to the start.
    #[must_use]
    pub const fn round_trip(mut self) -> Self {
        self.return_to_start = true;
        self
    }

    /// End the route at a distinct point.
    #[must_use]
    pub const fn ending_at(mut self, end: Coordinate) -> Self {
        self.end = Some(end);
        self
    }
}

/// One leg of a solved route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// Where the leg starts.
    pub from: Coordinate,
    /// Where the leg ends.
    pub to: Coordinate,
    /// Leg road distance in metres.
    pub distance_meters: f64,
    /// Leg travel time in seconds.
    pub duration_seconds: f64,
    /// Set on the closing leg of a round trip.
    pub is_return: bool,
}

/// A solved visiting order with per-leg segments and rounded totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSolution {
    /// Stops in visiting order.
    pub stops: Vec<RouteStop>,
    /// Contiguous legs from start through the stops (and the return leg on
    /// round trips).
    pub segments: Vec<RouteSegment>,
    /// Total distance in kilometres, rounded to one decimal.
    pub total_distance_km: f64,
    /// Total duration in whole minutes.
    pub total_duration_minutes: u32,
    /// Human-readable summary of the solution.
    pub summary: String,
}

impl RouteSolution {
    /// Assemble a solution from its legs, rounding the totals.
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "totals are sums of leg measurements rounded for display"
    )]
    #[must_use]
    pub fn from_segments(stops: Vec<RouteStop>, segments: Vec<RouteSegment>) -> Self {
        let total_meters: f64 = segments.iter().map(|leg| leg.distance_meters).sum();
        let total_seconds: f64 = segments.iter().map(|leg| leg.duration_seconds).sum();
        let total_distance_km = (total_meters / 100.0).round() / 10.0;
        let total_duration_minutes = (total_seconds / 60.0).round().max(0.0) as u32;
        let summary = format!(
            "{} stops, {} ({})",
            stops.len(),
            format_distance(total_meters),
            format_duration(total_seconds)
        );
        Self {
            stops,
            segments,
            total_distance_km,
            total_duration_minutes,
            summary,
        }
    }
}

/// Terminal failures from the route optimizer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// The stop set was empty or otherwise unusable.
    #[error("invalid route input: {0}")]
    InvalidInput(String),

    /// A required edge could not be resolved even after the distance layer
    /// exhausted every fallback. Names the unreachable pair.
    #[error("route unavailable: no distance between {from} and {to}: {source}")]
    Unavailable {
        /// Origin of the unobtainable edge.
        from: Coordinate,
        /// Destination of the unobtainable edge.
        to: Coordinate,
        /// The distance-layer failure.
        #[source]
        source: DistanceError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).expect("valid test coordinate")
    }

    fn leg(meters: f64, seconds: f64) -> RouteSegment {
        RouteSegment {
            from: coordinate(0.0, 0.0),
            to: coordinate(1.0, 1.0),
            distance_meters: meters,
            duration_seconds: seconds,
            is_return: false,
        }
    }

    #[test]
    fn totals_are_rounded_for_display() {
        let stops = vec![RouteStop::new("a".to_owned(), coordinate(1.0, 1.0))];
        let solution = RouteSolution::from_segments(stops, vec![leg(12_340.0, 890.0)]);
        assert_eq!(solution.total_distance_km, 12.3);
        assert_eq!(solution.total_duration_minutes, 15);
        assert!(solution.summary.contains("1 stops"));
    }

    #[test]
    fn empty_segments_total_zero() {
        let solution = RouteSolution::from_segments(Vec::new(), Vec::new());
        assert_eq!(solution.total_distance_km, 0.0);
        assert_eq!(solution.total_duration_minutes, 0);
    }
}
