//! Request options affecting how a distance is computed.

use serde::{Deserialize, Serialize};

/// Travel mode requested from the providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    /// Road network by car.
    #[default]
    Driving,
    /// Pedestrian network.
    Walking,
    /// Cycle network.
    Bicycling,
}

impl TravelMode {
    /// Stable lowercase form used in cache keys and provider URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
        }
    }
}

/// Traffic model for providers that support traffic-aware durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficModel {
    /// No traffic awareness requested.
    #[default]
    None,
    /// Provider's best estimate for current conditions.
    BestGuess,
    /// Assume worse-than-average conditions.
    Pessimistic,
    /// Assume better-than-average conditions.
    Optimistic,
}

impl TrafficModel {
    /// Stable snake-case form used in cache keys and provider URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BestGuess => "best_guess",
            Self::Pessimistic => "pessimistic",
            Self::Optimistic => "optimistic",
        }
    }

    /// Whether this model asks the provider for traffic-aware durations.
    #[must_use]
    pub const fn is_traffic_aware(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Provider-priority strategy for the fallback manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Free providers first; the commercial API is a fallback.
    #[default]
    CostOptimized,
    /// Commercial traffic-aware matrix first.
    QualityOptimized,
}

/// Per-request options.
///
/// The strategy field overrides the engine's configured default for a single
/// call; `None` keeps the configured strategy.
///
/// # Examples
/// ```
/// use fieldroute_core::{DistanceOptions, TrafficModel, TravelMode};
///
/// let options = DistanceOptions::default().with_traffic(TrafficModel::BestGuess);
/// assert_eq!(options.mode, TravelMode::Driving);
/// assert!(options.traffic.is_traffic_aware());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DistanceOptions {
    /// Requested travel mode.
    pub mode: TravelMode,
    /// Requested traffic model.
    pub traffic: TrafficModel,
    /// Per-call strategy override.
    pub strategy: Option<SelectionStrategy>,
}

impl DistanceOptions {
    /// Default options in `const` position.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: TravelMode::Driving,
            traffic: TrafficModel::None,
            strategy: None,
        }
    }

    /// Set the travel mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: TravelMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the traffic model.
    #[must_use]
    pub const fn with_traffic(mut self, traffic: TrafficModel) -> Self {
        self.traffic = traffic;
        self
    }

    /// Override the selection strategy for this call only.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TrafficModel::None, false)]
    #[case(TrafficModel::BestGuess, true)]
    #[case(TrafficModel::Pessimistic, true)]
    fn traffic_awareness(#[case] model: TrafficModel, #[case] aware: bool) {
        assert_eq!(model.is_traffic_aware(), aware);
    }

    #[test]
    fn defaults_are_free_and_trafficless() {
        let options = DistanceOptions::default();
        assert_eq!(options.mode, TravelMode::Driving);
        assert_eq!(options.traffic, TrafficModel::None);
        assert!(options.strategy.is_none());
    }
}
