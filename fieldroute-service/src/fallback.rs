//! Quota-aware provider fallback.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use tokio::time::timeout;

use fieldroute_core::{
    ConnectionStatus, Coordinate, DistanceCache, DistanceError, DistanceOptions, DistanceProvider,
    DistanceResult, ProviderId, QuotaStore, SelectionStrategy, VolatilityClass,
};

use crate::config::EngineConfig;

/// Outcome of probing one configured provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProbe {
    /// Provider that was probed.
    pub provider: ProviderId,
    /// What the probe found.
    pub status: ConnectionStatus,
}

/// Walks the provider chain for one pair, consulting the cache first and
/// the quota ledger before every attempt.
///
/// Any [`DistanceError`] or timeout from one provider moves on to the
/// next; only total exhaustion surfaces, as
/// [`DistanceError::AllProvidersFailed`].
pub struct FallbackManager {
    providers: Vec<Arc<dyn DistanceProvider>>,
    cache: Arc<dyn DistanceCache>,
    quota: Arc<dyn QuotaStore>,
    config: EngineConfig,
}

/// Provider order for a strategy. Approximation sits last in both chains:
/// it cannot fail, so anywhere earlier it would mask the real providers.
const fn chain_order(strategy: SelectionStrategy) -> [ProviderId; 3] {
    match strategy {
        SelectionStrategy::CostOptimized => [
            ProviderId::OsrmRouting,
            ProviderId::MatrixApi,
            ProviderId::Approximation,
        ],
        SelectionStrategy::QualityOptimized => [
            ProviderId::MatrixApi,
            ProviderId::OsrmRouting,
            ProviderId::Approximation,
        ],
    }
}

impl FallbackManager {
    /// Assemble a manager from its collaborators.
    ///
    /// Providers absent from `providers` are simply skipped by the chain,
    /// so a deployment without a commercial API key runs on the remaining
    /// two.
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn DistanceProvider>>,
        cache: Arc<dyn DistanceCache>,
        quota: Arc<dyn QuotaStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            providers,
            cache,
            quota,
            config,
        }
    }

    /// The configuration this manager runs under.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn provider_by_id(&self, id: ProviderId) -> Option<&Arc<dyn DistanceProvider>> {
        self.providers.iter().find(|provider| provider.id() == id)
    }

    /// Registered providers in chain order for `strategy`.
    fn chain(&self, strategy: SelectionStrategy) -> Vec<&Arc<dyn DistanceProvider>> {
        chain_order(strategy)
            .into_iter()
            .filter_map(|id| self.provider_by_id(id))
            .collect()
    }

    /// The provider a matrix request would go to right now: the first
    /// chain entry with daily quota left.
    #[must_use]
    pub fn active_provider(
        &self,
        strategy: SelectionStrategy,
    ) -> Option<&Arc<dyn DistanceProvider>> {
        let today = Utc::now().date_naive();
        self.chain(strategy).into_iter().find(|provider| {
            let id = provider.id();
            !self
                .quota
                .usage(id, today)
                .is_exhausted(self.config.daily_limits.limit_for(id))
        })
    }

    /// Shared read access to the distance cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn DistanceCache> {
        &self.cache
    }

    pub(crate) fn record_matrix_success(&self, provider: ProviderId) {
        self.quota.record_success(provider, Utc::now().date_naive());
    }

    pub(crate) fn record_matrix_failure(&self, provider: ProviderId) {
        self.quota.record_failure(provider, Utc::now().date_naive());
    }

    /// Resolve one pair through the cache and the fallback chain.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::AllProvidersFailed`] once every registered
    /// provider has failed or been skipped for quota; the wrapped error is
    /// the last failure observed.
    pub async fn resolve(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
    ) -> Result<DistanceResult, DistanceError> {
        if let Some(hit) = self.cache.get(origin, destination, options) {
            debug!("cache hit for {origin} -> {destination}");
            return Ok(hit);
        }

        let strategy = options.strategy.unwrap_or(self.config.strategy);
        let today = Utc::now().date_naive();
        let mut attempted: Vec<ProviderId> = Vec::new();
        let mut last_error: Option<DistanceError> = None;

        for provider in self.chain(strategy) {
            let id = provider.id();
            let limit = self.config.daily_limits.limit_for(id);
            if self.quota.usage(id, today).is_exhausted(limit) {
                debug!("skipping {id}: daily quota of {limit} reached");
                last_error.get_or_insert(DistanceError::QuotaExceeded { provider: id });
                continue;
            }

            attempted.push(id);
            let attempt = timeout(
                self.config.call_timeout(),
                provider.distance(origin, destination, options),
            )
            .await;
            match attempt {
                Ok(Ok(result)) => {
                    let volatility = VolatilityClass::of(&result);
                    self.cache
                        .put(origin, destination, options, &result, volatility);
                    self.quota.record_success(id, today);
                    return Ok(result);
                }
                Ok(Err(error)) => {
                    warn!("{id} failed for {origin} -> {destination}: {error}");
                    last_error = Some(error);
                }
                Err(_) => {
                    let error = DistanceError::Timeout {
                        provider: id,
                        timeout_secs: self.config.call_timeout_secs,
                    };
                    warn!("{error}");
                    last_error = Some(error);
                }
            }
        }

        for id in &attempted {
            self.quota.record_failure(*id, today);
        }
        Err(DistanceError::AllProvidersFailed {
            attempts: attempted.len(),
            last: Box::new(last_error.unwrap_or_else(|| {
                DistanceError::InvalidInput("no providers registered".to_owned())
            })),
        })
    }

    /// Probe every registered provider, in registration order.
    pub async fn test_connections(&self) -> Vec<ProviderProbe> {
        let mut report = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let status = match timeout(self.config.call_timeout(), provider.test_connection()).await
            {
                Ok(status) => status,
                Err(_) => ConnectionStatus::Failed {
                    reason: format!(
                        "probe timed out after {}s",
                        self.config.call_timeout_secs
                    ),
                },
            };
            report.push(ProviderProbe {
                provider: provider.id(),
                status,
            });
        }
        report
    }
}
