//! The distance cache seam and its entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Coordinate, DistanceOptions, DistanceResult};

/// How quickly a cached value goes stale.
///
/// Road distances barely change; traffic-aware durations rot in minutes.
/// The class selects which configured TTL applies to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityClass {
    /// Long-lived road geometry data (TTL measured in days).
    Static,
    /// Traffic-dependent data (TTL measured in minutes).
    Traffic,
}

impl VolatilityClass {
    /// Classify a result: anything carrying a traffic-aware duration is
    /// volatile, everything else is static.
    #[must_use]
    pub const fn of(result: &DistanceResult) -> Self {
        if result.duration_in_traffic_seconds.is_some() {
            Self::Traffic
        } else {
            Self::Static
        }
    }

    /// Stable lowercase name used in persisted rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Traffic => "traffic",
        }
    }

    /// Parse the persisted form produced by [`VolatilityClass::as_str`].
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "static" => Some(Self::Static),
            "traffic" => Some(Self::Traffic),
            _ => None,
        }
    }
}

/// A cached distance with its expiry bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached result.
    pub payload: DistanceResult,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// Instant after which the entry behaves as a miss.
    pub expires_at: DateTime<Utc>,
    /// TTL bucket the entry was filed under.
    pub volatility: VolatilityClass,
}

impl CacheEntry {
    /// Whether the entry has passed its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Canonical cache key for a pair and the options that affect its result.
///
/// Coordinates are normalised to fixed precision (absorbing GPS jitter);
/// travel mode and traffic model participate because they change the
/// answer. The selection strategy does not: it only changes who answers.
///
/// # Examples
/// ```
/// use fieldroute_core::{Coordinate, DistanceOptions, cache_key};
///
/// let a = Coordinate::new(50.0647, 19.945)?;
/// let b = Coordinate::new(52.2297, 21.0122)?;
/// let key = cache_key(a, b, &DistanceOptions::default());
/// assert_eq!(key, "50.06470,19.94500|52.22970,21.01220|driving|none");
/// # Ok::<(), fieldroute_core::DistanceError>(())
/// ```
#[must_use]
pub fn cache_key(origin: Coordinate, destination: Coordinate, options: &DistanceOptions) -> String {
    format!(
        "{}|{}|{}|{}",
        origin.key(),
        destination.key(),
        options.mode.as_str(),
        options.traffic.as_str()
    )
}

/// Two-tier key-value cache for resolved distances.
///
/// Lookups are synchronous; implementations must be cheap enough to sit on
/// the hot path in front of every provider call. Expired entries behave as
/// misses and are removed opportunistically.
pub trait DistanceCache: Send + Sync {
    /// Look up a pair; `None` is a miss (including expiry).
    fn get(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
    ) -> Option<DistanceResult>;

    /// Store a fresh result under the pair's key.
    ///
    /// Writes are last-writer-wins; concurrent writers racing on one key is
    /// acceptable because both hold equally fresh values.
    fn put(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
        result: &DistanceResult,
        volatility: VolatilityClass,
    );
}
