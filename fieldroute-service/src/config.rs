//! Engine tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use fieldroute_core::{ProviderId, SelectionStrategy};

/// Daily request ceilings per provider.
///
/// A limit of `0` means unlimited. The approximation provider costs
/// nothing and is never limited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyLimits {
    /// Ceiling for the OSRM routing provider.
    pub osrm_routing: u32,
    /// Ceiling for the commercial matrix provider.
    pub matrix_api: u32,
}

impl DailyLimits {
    /// The configured ceiling for `provider` (`0` = unlimited).
    #[must_use]
    pub const fn limit_for(&self, provider: ProviderId) -> u32 {
        match provider {
            ProviderId::OsrmRouting => self.osrm_routing,
            ProviderId::MatrixApi => self.matrix_api,
            ProviderId::Approximation => 0,
        }
    }
}

/// Configuration for [`DistanceService`](crate::DistanceService) and the
/// fallback manager beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default provider-ordering strategy; per-call options may override.
    pub strategy: SelectionStrategy,
    /// Ceiling on any single provider attempt, in seconds.
    pub call_timeout_secs: u64,
    /// Pause between successive matrix sub-grid requests, in milliseconds.
    pub chunk_delay_ms: u64,
    /// Concurrently in-flight provider calls during batch enrichment.
    pub enrichment_concurrency: usize,
    /// Pause between enrichment windows, in milliseconds.
    pub window_delay_ms: u64,
    /// Daily per-provider request ceilings.
    pub daily_limits: DailyLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            call_timeout_secs: 30,
            chunk_delay_ms: 200,
            enrichment_concurrency: 5,
            window_delay_ms: 100,
            daily_limits: DailyLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Replace the default ordering strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replace the per-attempt timeout.
    #[must_use]
    pub const fn with_call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    /// Replace the daily ceilings.
    #[must_use]
    pub const fn with_daily_limits(mut self, limits: DailyLimits) -> Self {
        self.daily_limits = limits;
        self
    }

    /// Replace the enrichment window size; a window of `0` is treated as 1.
    #[must_use]
    pub const fn with_enrichment_concurrency(mut self, window: usize) -> Self {
        self.enrichment_concurrency = window;
        self
    }

    /// Remove the inter-chunk and inter-window pauses, for tests.
    #[must_use]
    pub const fn without_pacing(mut self) -> Self {
        self.chunk_delay_ms = 0;
        self.window_delay_ms = 0;
        self
    }

    /// Per-attempt timeout as a [`Duration`].
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Inter-chunk pause as a [`Duration`].
    #[must_use]
    pub const fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    /// Inter-window pause as a [`Duration`].
    #[must_use]
    pub const fn window_delay(&self) -> Duration {
        Duration::from_millis(self.window_delay_ms)
    }

    /// Window size clamped to at least one in-flight call.
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.enrichment_concurrency.max(1)
    }
}
