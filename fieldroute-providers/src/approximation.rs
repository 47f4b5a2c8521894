//! Zero-network geometric approximation provider.
//!
//! Computes the haversine straight-line distance, classifies the pair as a
//! city or intercity trip by a distance threshold, applies a class-specific
//! road-shape multiplier, and derives the duration from a class average
//! speed. It never touches the network, costs nothing, and cannot fail for
//! valid coordinates, which is why the fallback manager pins it last in
//! every chain.

use async_trait::async_trait;
use geo::{Distance, Haversine};

use fieldroute_core::{
    BatchLimits, ConnectionStatus, Coordinate, DistanceError, DistanceMatrix, DistanceOptions,
    DistanceProvider, DistanceResult, MatrixCell, ProviderId,
};

use crate::validated;

/// Tuning constants for [`ApproximationProvider`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximationConfig {
    /// Straight-line distance below which a pair counts as a city trip.
    pub city_threshold_meters: f64,
    /// Road-shape multiplier for city trips (streets wander more).
    pub city_multiplier: f64,
    /// Road-shape multiplier for intercity trips.
    pub intercity_multiplier: f64,
    /// Average speed assumed for city trips, km/h.
    pub city_speed_kmh: f64,
    /// Average speed assumed for intercity trips, km/h.
    pub intercity_speed_kmh: f64,
}

impl Default for ApproximationConfig {
    fn default() -> Self {
        Self {
            city_threshold_meters: 30_000.0,
            city_multiplier: 1.4,
            intercity_multiplier: 1.3,
            city_speed_kmh: 30.0,
            intercity_speed_kmh: 90.0,
        }
    }
}

/// Instant straight-line approximation of road distance and travel time.
#[derive(Debug, Clone, Default)]
pub struct ApproximationProvider {
    config: ApproximationConfig,
}

impl ApproximationProvider {
    /// Provider with default tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with explicit tuning.
    #[must_use]
    pub const fn with_config(config: ApproximationConfig) -> Self {
        Self { config }
    }

    /// Approximate one validated pair.
    #[expect(
        clippy::float_arithmetic,
        reason = "geometric approximation is floating point by nature"
    )]
    fn approximate(&self, origin: Coordinate, destination: Coordinate) -> DistanceResult {
        let straight_line = Haversine.distance(origin.to_point(), destination.to_point());
        let (multiplier, speed_kmh) = if straight_line < self.config.city_threshold_meters {
            (self.config.city_multiplier, self.config.city_speed_kmh)
        } else {
            (self.config.intercity_multiplier, self.config.intercity_speed_kmh)
        };
        let distance_meters = straight_line * multiplier;
        let speed_mps = speed_kmh / 3.6;
        let duration_seconds = if speed_mps > 0.0 {
            distance_meters / speed_mps
        } else {
            0.0
        };
        DistanceResult::new(
            distance_meters,
            duration_seconds,
            ProviderId::Approximation,
            0,
        )
    }
}

#[async_trait]
impl DistanceProvider for ApproximationProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Approximation
    }

    fn cost_per_request(&self) -> u32 {
        0
    }

    fn batch_limits(&self) -> BatchLimits {
        // Purely local computation; no meaningful cap.
        BatchLimits::new(usize::MAX, usize::MAX)
    }

    async fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _options: &DistanceOptions,
    ) -> Result<DistanceResult, DistanceError> {
        let origin = validated(origin)?;
        let destination = validated(destination)?;
        Ok(self.approximate(origin, destination))
    }

    async fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        _options: &DistanceOptions,
    ) -> Result<DistanceMatrix, DistanceError> {
        if origins.is_empty() || destinations.is_empty() {
            return Err(DistanceError::InvalidInput(
                "matrix request needs at least one origin and one destination".to_owned(),
            ));
        }
        for coordinate in origins.iter().chain(destinations) {
            validated(*coordinate)?;
        }
        let mut matrix = DistanceMatrix::empty(origins.to_vec(), destinations.to_vec());
        for (row, origin) in origins.iter().enumerate() {
            for (column, destination) in destinations.iter().enumerate() {
                matrix.set_cell(
                    row,
                    column,
                    MatrixCell::Ok(self.approximate(*origin, *destination)),
                );
            }
        }
        Ok(matrix)
    }

    async fn test_connection(&self) -> ConnectionStatus {
        ConnectionStatus::Ok { latency_ms: 0 }
    }
}
