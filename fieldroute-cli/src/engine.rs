//! Shared engine wiring for the subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use fieldroute_core::{DistanceCache, DistanceProvider, ProviderId, QuotaStore, SelectionStrategy};
use fieldroute_providers::{
    ApproximationProvider, MatrixApiConfig, MatrixApiProvider, OsrmConfig, OsrmProvider,
};
use fieldroute_service::{DistanceService, EngineConfig};
use fieldroute_store::{
    CacheTtls, MemoryDistanceCache, MemoryQuotaStore, SqliteDistanceCache, SqliteQuotaStore,
    TieredDistanceCache,
};

use crate::{CliError, parse_strategy};

const DEFAULT_OSRM_URL: &str = "http://localhost:5000";
const DEFAULT_MATRIX_API_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Engine options shared by every subcommand, after merging.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EngineSettings {
    pub(crate) osrm_url: String,
    pub(crate) matrix_api_url: String,
    /// Commercial provider credential; the provider is skipped entirely
    /// when absent.
    pub(crate) matrix_api_key: Option<String>,
    /// Durable cache/quota database; in-memory stores when absent.
    pub(crate) cache_db: Option<PathBuf>,
    pub(crate) strategy: SelectionStrategy,
}

impl EngineSettings {
    pub(crate) fn resolve(
        osrm_url: Option<String>,
        matrix_api_url: Option<String>,
        matrix_api_key: Option<String>,
        cache_db: Option<PathBuf>,
        strategy: Option<String>,
    ) -> Result<Self, CliError> {
        let strategy = strategy
            .as_deref()
            .map(parse_strategy)
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            osrm_url: osrm_url.unwrap_or_else(|| DEFAULT_OSRM_URL.to_owned()),
            matrix_api_url: matrix_api_url.unwrap_or_else(|| DEFAULT_MATRIX_API_URL.to_owned()),
            matrix_api_key,
            cache_db,
            strategy,
        })
    }
}

/// Assemble the distance service a subcommand runs against.
pub(crate) fn build_service(settings: &EngineSettings) -> Result<DistanceService, CliError> {
    let mut providers: Vec<Arc<dyn DistanceProvider>> = Vec::new();
    let osrm = OsrmProvider::with_config(OsrmConfig::new(settings.osrm_url.clone())).map_err(
        |source| CliError::BuildProvider {
            provider: ProviderId::OsrmRouting,
            source,
        },
    )?;
    providers.push(Arc::new(osrm));
    if let Some(key) = &settings.matrix_api_key {
        let matrix_api = MatrixApiProvider::with_config(MatrixApiConfig::new(
            settings.matrix_api_url.clone(),
            key.clone(),
        ))
        .map_err(|source| CliError::BuildProvider {
            provider: ProviderId::MatrixApi,
            source,
        })?;
        providers.push(Arc::new(matrix_api));
    }
    providers.push(Arc::new(ApproximationProvider::new()));

    let (cache, quota): (Arc<dyn DistanceCache>, Arc<dyn QuotaStore>) = match &settings.cache_db {
        Some(path) => {
            let durable = SqliteDistanceCache::open(path, CacheTtls::default())?;
            let cache = TieredDistanceCache::new(MemoryDistanceCache::new(), durable);
            let quota = SqliteQuotaStore::open(path)?;
            (Arc::new(cache), Arc::new(quota))
        }
        None => (
            Arc::new(MemoryDistanceCache::new()),
            Arc::new(MemoryQuotaStore::new()),
        ),
    };

    let config = EngineConfig::default().with_strategy(settings.strategy);
    Ok(DistanceService::new(providers, cache, quota, config))
}
