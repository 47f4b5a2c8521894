//! Per-optimisation edge memo.

use std::collections::HashMap;

use fieldroute_core::{
    Coordinate, DistanceOptions, DistanceResult, DistanceSource, Objective, ProviderId, RouteError,
};

/// Memoised edge lookups keyed by rounded coordinate pairs.
///
/// Lives for one optimisation run. Every unique directed edge reaches the
/// underlying [`DistanceSource`] at most once; permutation search replays
/// edges from the map.
pub(crate) struct EdgeMemo<'a, S> {
    source: &'a S,
    options: DistanceOptions,
    edges: HashMap<(String, String), DistanceResult>,
}

impl<'a, S: DistanceSource> EdgeMemo<'a, S> {
    pub(crate) fn new(source: &'a S, options: DistanceOptions) -> Self {
        Self {
            source,
            options,
            edges: HashMap::new(),
        }
    }

    /// How many unique edges have been fetched so far.
    #[cfg(test)]
    pub(crate) fn fetched(&self) -> usize {
        self.edges.len()
    }

    /// Resolve an edge, fetching it on first use.
    ///
    /// Endpoints sharing a rounded key form a zero-length edge that never
    /// reaches the source; duplicate stop locations are ordinary input.
    /// An unresolvable edge fails the whole optimisation: the distance
    /// layer has already exhausted its fallbacks by the time an error
    /// reaches this point.
    pub(crate) async fn edge(
        &mut self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<DistanceResult, RouteError> {
        let key = (from.key(), to.key());
        if key.0 == key.1 {
            return Ok(zero_length_edge());
        }
        if let Some(hit) = self.edges.get(&key) {
            return Ok(hit.clone());
        }
        match self.source.distance(from, to, &self.options).await {
            Ok(result) => {
                self.edges.insert(key, result.clone());
                Ok(result)
            }
            Err(source) => Err(RouteError::Unavailable { from, to, source }),
        }
    }

    /// Replay an already-fetched edge's cost; `None` when never fetched.
    /// Zero-length edges always replay at zero cost.
    pub(crate) fn replay_cost(
        &self,
        from: Coordinate,
        to: Coordinate,
        objective: Objective,
    ) -> Option<f64> {
        let key = (from.key(), to.key());
        if key.0 == key.1 {
            return Some(0.0);
        }
        self.edges.get(&key).map(|result| edge_cost(result, objective))
    }
}

/// The degenerate result for endpoints with the same rounded key.
fn zero_length_edge() -> DistanceResult {
    DistanceResult::new(0.0, 0.0, ProviderId::Approximation, 0)
}

/// The scalar a tour minimises for one leg.
pub(crate) fn edge_cost(result: &DistanceResult, objective: Objective) -> f64 {
    match objective {
        Objective::Shortest => result.distance_meters,
        Objective::Fastest => result.effective_duration_seconds(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldroute_core::ProviderId;
    use fieldroute_core::test_support::PlanarSource;

    fn coordinate(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).expect("valid test coordinate")
    }

    #[tokio::test]
    async fn repeated_edges_hit_the_source_once() {
        let source = PlanarSource::new();
        let mut memo = EdgeMemo::new(&source, DistanceOptions::default());
        let a = coordinate(0.0, 0.0);
        let b = coordinate(0.0, 1.0);

        for _ in 0..4 {
            memo.edge(a, b).await.expect("edge resolves");
        }

        assert_eq!(source.calls(), 1);
        assert_eq!(memo.fetched(), 1);
    }

    #[tokio::test]
    async fn reverse_direction_is_a_distinct_edge() {
        let source = PlanarSource::new();
        let mut memo = EdgeMemo::new(&source, DistanceOptions::default());
        let a = coordinate(0.0, 0.0);
        let b = coordinate(0.0, 1.0);

        memo.edge(a, b).await.expect("forward edge");
        memo.edge(b, a).await.expect("reverse edge");

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn a_zero_length_edge_never_reaches_the_source() {
        let source = PlanarSource::new();
        let mut memo = EdgeMemo::new(&source, DistanceOptions::default());
        let a = coordinate(50.0, 19.0);

        let result = memo.edge(a, a).await.expect("zero edge resolves");

        assert!(result.distance_meters.abs() < f64::EPSILON);
        assert_eq!(source.calls(), 0);
        assert_eq!(memo.replay_cost(a, a, Objective::Shortest), Some(0.0));
    }

    #[test]
    fn fastest_prefers_the_traffic_duration() {
        let free_flow = DistanceResult::new(10_000.0, 600.0, ProviderId::MatrixApi, 1);
        let congested = free_flow.clone().with_traffic_duration(900.0);

        assert!((edge_cost(&free_flow, Objective::Fastest) - 600.0).abs() < f64::EPSILON);
        assert!((edge_cost(&congested, Objective::Fastest) - 900.0).abs() < f64::EPSILON);
        assert!((edge_cost(&congested, Objective::Shortest) - 10_000.0).abs() < f64::EPSILON);
    }
}
