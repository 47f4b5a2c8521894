//! The seam between the route solver and the distance layer.

use async_trait::async_trait;

use crate::{Coordinate, DistanceError, DistanceOptions, DistanceResult};

/// Anything that can resolve one coordinate pair to a distance.
///
/// The orchestrating service implements this; solver tests substitute
/// scripted sources so route optimisation is exercised without providers,
/// caches, or quotas behind it.
#[async_trait]
pub trait DistanceSource: Send + Sync {
    /// Resolve one origin/destination pair.
    ///
    /// # Errors
    ///
    /// Propagates the full [`DistanceError`] taxonomy; the solver treats
    /// any failure here as the edge being unobtainable.
    async fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
    ) -> Result<DistanceResult, DistanceError>;
}
