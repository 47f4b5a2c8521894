//! Error taxonomy shared by providers, the cache, and the fallback manager.

use thiserror::Error;

use crate::{Coordinate, ProviderId};

/// Errors surfaced by distance providers and the fallback manager.
///
/// Providers translate their transport- and service-level failures into
/// this closed set; the fallback manager absorbs everything except total
/// exhaustion, which reaches the caller as
/// [`DistanceError::AllProvidersFailed`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistanceError {
    /// A coordinate component was out of range or non-finite.
    #[error("invalid location: lat {lat}, lng {lng}")]
    InvalidLocation {
        /// Offending latitude.
        lat: f64,
        /// Offending longitude.
        lng: f64,
    },

    /// A request was malformed before any provider was contacted, e.g. an
    /// oversized matrix for the provider's batch caps.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A provider call exceeded its deadline.
    ///
    /// Timeouts follow the same fallback path as network failures; they are
    /// never fatal on their own.
    #[error("{provider} timed out after {timeout_secs}s")]
    Timeout {
        /// Provider that timed out.
        provider: ProviderId,
        /// Deadline that elapsed.
        timeout_secs: u64,
    },

    /// Transport-level failure talking to a provider.
    #[error("{provider} network error: {message}")]
    Network {
        /// Provider that failed.
        provider: ProviderId,
        /// Underlying transport message.
        message: String,
    },

    /// The provider's daily quota is exhausted or it rejected the
    /// credential. Never retried; falls through to the next provider.
    #[error("{provider} quota exhausted")]
    QuotaExceeded {
        /// Provider whose quota is spent.
        provider: ProviderId,
    },

    /// The provider answered but found no route between the pair.
    #[error("no route between {from} and {to}")]
    NoRoute {
        /// Origin of the unroutable pair.
        from: Coordinate,
        /// Destination of the unroutable pair.
        to: Coordinate,
    },

    /// Malformed or unexpected provider response payload.
    #[error("{provider} returned an unparseable response: {message}")]
    Parse {
        /// Provider whose payload failed to parse.
        provider: ProviderId,
        /// Decoding failure description.
        message: String,
    },

    /// Every provider in the fallback chain was attempted (or skipped for
    /// quota) without success. Carries the last underlying failure.
    #[error("all {attempts} providers failed; last error: {last}")]
    AllProvidersFailed {
        /// Number of providers attempted.
        attempts: usize,
        /// Final failure in the chain.
        last: Box<DistanceError>,
    },
}

impl DistanceError {
    /// Whether retrying the same provider could help.
    ///
    /// Only transport-level failures are transient; quota, validation, and
    /// no-route outcomes will not change on a retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network { .. })
    }
}
