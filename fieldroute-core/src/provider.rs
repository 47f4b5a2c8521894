//! The provider adapter seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Coordinate, DistanceError, DistanceMatrix, DistanceOptions, DistanceResult};

/// Closed set of distance providers known to the engine.
///
/// Dispatch is always over this tagged set; there is no string-keyed
/// provider registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    /// Free OSRM road routing, no traffic awareness.
    OsrmRouting,
    /// Commercial traffic-aware distance-matrix API.
    MatrixApi,
    /// Zero-network geometric approximation.
    Approximation,
}

impl ProviderId {
    /// Stable kebab-case name used in logs and persisted quota rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OsrmRouting => "osrm-routing",
            Self::MatrixApi => "matrix-api",
            Self::Approximation => "approximation",
        }
    }

    /// Parse the persisted form produced by [`ProviderId::as_str`].
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "osrm-routing" => Some(Self::OsrmRouting),
            "matrix-api" => Some(Self::MatrixApi),
            "approximation" => Some(Self::Approximation),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hard per-call caps a provider imposes on matrix requests.
///
/// Oversized requests must be rejected at the adapter, never truncated;
/// the orchestrator is responsible for chunking to fit these caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLimits {
    /// Maximum origins per call.
    pub max_origins: usize,
    /// Maximum destinations per call.
    pub max_destinations: usize,
}

impl BatchLimits {
    /// Construct limits from the two caps.
    #[must_use]
    pub const fn new(max_origins: usize, max_destinations: usize) -> Self {
        Self {
            max_origins,
            max_destinations,
        }
    }

    /// Whether a request of the given shape fits within the caps.
    #[must_use]
    pub const fn admits(&self, origins: usize, destinations: usize) -> bool {
        origins <= self.max_origins && destinations <= self.max_destinations
    }
}

/// Outcome of a provider connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Provider reachable; round trip took `latency_ms`.
    Ok {
        /// Probe round-trip time in milliseconds.
        latency_ms: u64,
    },
    /// Provider unreachable or misconfigured.
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

impl ConnectionStatus {
    /// Whether the probe succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Uniform interface over the three distance-computation strategies.
///
/// Adapters validate coordinates before use and signal failures through the
/// [`DistanceError`] taxonomy. Transport retries happen inside an adapter
/// only; cross-provider fallback belongs to the manager above this seam.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    /// Which provider this adapter is.
    fn id(&self) -> ProviderId;

    /// Billing units one single-pair call consumes (0 for free providers).
    fn cost_per_request(&self) -> u32;

    /// The provider's hard matrix caps.
    fn batch_limits(&self) -> BatchLimits;

    /// Resolve one origin/destination pair.
    ///
    /// # Errors
    ///
    /// Any [`DistanceError`] variant except `AllProvidersFailed`, which is
    /// reserved for the fallback manager.
    async fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
    ) -> Result<DistanceResult, DistanceError>;

    /// Resolve a full origins × destinations matrix in one call.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::InvalidInput`] when the request exceeds
    /// [`DistanceProvider::batch_limits`], plus any per-call failure.
    async fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &DistanceOptions,
    ) -> Result<DistanceMatrix, DistanceError>;

    /// Probe connectivity without consuming quota where possible.
    async fn test_connection(&self) -> ConnectionStatus;
}
