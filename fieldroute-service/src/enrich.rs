//! Bulk enrichment outcomes.

use fieldroute_core::{Coordinate, DistanceResult};

/// One target's enrichment outcome.
///
/// Failures degrade to the infinite-distance sentinel rather than an
/// error, so a bad target never sinks the batch it travelled in.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTarget {
    /// The target coordinate, as supplied by the caller.
    pub target: Coordinate,
    /// Distance from the batch origin in metres; `f64::INFINITY` when the
    /// target could not be resolved.
    pub distance_meters: f64,
    /// The full result when resolution succeeded.
    pub result: Option<DistanceResult>,
}

impl EnrichedTarget {
    pub(crate) fn resolved(target: Coordinate, result: DistanceResult) -> Self {
        Self {
            target,
            distance_meters: result.distance_meters,
            result: Some(result),
        }
    }

    pub(crate) const fn unreachable(target: Coordinate) -> Self {
        Self {
            target,
            distance_meters: f64::INFINITY,
            result: None,
        }
    }

    /// Whether the target resolved to a finite distance.
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        self.result.is_some()
    }
}

/// Per-item outcomes of one batch enrichment, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// One outcome per input target, input order preserved.
    pub items: Vec<EnrichedTarget>,
    /// How many targets resolved.
    pub succeeded: usize,
    /// How many degraded to the unreachable sentinel.
    pub failed: usize,
}

impl BatchReport {
    pub(crate) fn from_items(items: Vec<EnrichedTarget>) -> Self {
        let succeeded = items.iter().filter(|item| item.is_reachable()).count();
        let failed = items.len() - succeeded;
        Self {
            items,
            succeeded,
            failed,
        }
    }
}
