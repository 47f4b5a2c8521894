//! The distance-engine facade.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use log::{debug, warn};
use tokio::time::{sleep, timeout};

use fieldroute_core::{
    Coordinate, DistanceCache, DistanceError, DistanceMatrix, DistanceOptions, DistanceProvider,
    DistanceResult, DistanceSource, MatrixCell, QuotaStore, VolatilityClass,
};

use crate::config::EngineConfig;
use crate::enrich::{BatchReport, EnrichedTarget};
use crate::fallback::{FallbackManager, ProviderProbe};

/// Front door for every distance query.
///
/// Single pairs run through the fallback chain; matrices are chunked to
/// the active provider's caps; bulk enrichment degrades per item. The
/// service is assembled from its collaborators and shared by reference,
/// never reached through a global.
pub struct DistanceService {
    manager: FallbackManager,
}

impl DistanceService {
    /// Assemble a service from providers, cache, and quota ledger.
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn DistanceProvider>>,
        cache: Arc<dyn DistanceCache>,
        quota: Arc<dyn QuotaStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            manager: FallbackManager::new(providers, cache, quota, config),
        }
    }

    /// Wrap an already-built fallback manager.
    #[must_use]
    pub const fn from_manager(manager: FallbackManager) -> Self {
        Self { manager }
    }

    /// Probe every registered provider.
    pub async fn test_connections(&self) -> Vec<ProviderProbe> {
        self.manager.test_connections().await
    }

    /// Resolve a full origins × destinations matrix.
    ///
    /// Requests exceeding the active provider's caps are partitioned into
    /// sub-grids, issued with a fixed pause between them, and stitched back
    /// by original index. A failed sub-grid marks only its own cells
    /// [`MatrixCell::Failed`]; the rest of the matrix survives.
    pub async fn matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &DistanceOptions,
    ) -> DistanceMatrix {
        let mut matrix = DistanceMatrix::empty(origins.to_vec(), destinations.to_vec());
        if origins.is_empty() || destinations.is_empty() {
            return matrix;
        }

        let strategy = options.strategy.unwrap_or(self.manager.config().strategy);
        let Some(provider) = self.manager.active_provider(strategy).cloned() else {
            fail_block(
                &mut matrix,
                0,
                origins.len(),
                0,
                destinations.len(),
                "no provider with remaining quota",
            );
            return matrix;
        };

        let limits = provider.batch_limits();
        let row_size = limits.max_origins.max(1);
        let column_size = limits.max_destinations.max(1);
        let delay = self.manager.config().chunk_delay();
        let mut first = true;

        for (row_chunk, origin_chunk) in origins.chunks(row_size).enumerate() {
            let row_offset = row_chunk * row_size;
            for (column_chunk, destination_chunk) in destinations.chunks(column_size).enumerate() {
                let column_offset = column_chunk * column_size;
                if !first && !delay.is_zero() {
                    sleep(delay).await;
                }
                first = false;

                let call = timeout(
                    self.manager.config().call_timeout(),
                    provider.distance_matrix(origin_chunk, destination_chunk, options),
                );
                match call.await {
                    Ok(Ok(sub_grid)) => {
                        self.manager.record_matrix_success(provider.id());
                        for (i, row) in sub_grid.cells.into_iter().enumerate() {
                            for (j, cell) in row.into_iter().enumerate() {
                                matrix.set_cell(row_offset + i, column_offset + j, cell);
                            }
                        }
                    }
                    Ok(Err(error)) => {
                        warn!("matrix sub-grid via {} failed: {error}", provider.id());
                        self.manager.record_matrix_failure(provider.id());
                        fail_block(
                            &mut matrix,
                            row_offset,
                            origin_chunk.len(),
                            column_offset,
                            destination_chunk.len(),
                            &error.to_string(),
                        );
                    }
                    Err(_) => {
                        let error = DistanceError::Timeout {
                            provider: provider.id(),
                            timeout_secs: self.manager.config().call_timeout_secs,
                        };
                        warn!("matrix sub-grid: {error}");
                        self.manager.record_matrix_failure(provider.id());
                        fail_block(
                            &mut matrix,
                            row_offset,
                            origin_chunk.len(),
                            column_offset,
                            destination_chunk.len(),
                            &error.to_string(),
                        );
                    }
                }
            }
        }
        matrix
    }

    /// Like [`DistanceService::matrix`], but probes the cache per pair
    /// first. Only uncached pairs go to a provider; fresh results are
    /// merged positionally with the hits and written back to the cache.
    /// A dense miss block batches as one sub-matrix; sparse misses
    /// resolve pair by pair so cached pairs never re-spend provider
    /// quota.
    pub async fn matrix_with_cache(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &DistanceOptions,
    ) -> DistanceMatrix {
        let mut matrix = DistanceMatrix::empty(origins.to_vec(), destinations.to_vec());
        let cache = Arc::clone(self.manager.cache());

        let mut missed_pairs: Vec<(usize, usize)> = Vec::new();
        let mut missed_rows: BTreeSet<usize> = BTreeSet::new();
        let mut missed_columns: BTreeSet<usize> = BTreeSet::new();
        for (i, origin) in origins.iter().enumerate() {
            for (j, destination) in destinations.iter().enumerate() {
                if let Some(hit) = cache.get(*origin, *destination, options) {
                    matrix.set_cell(i, j, MatrixCell::Ok(hit));
                } else {
                    missed_pairs.push((i, j));
                    missed_rows.insert(i);
                    missed_columns.insert(j);
                }
            }
        }
        if missed_pairs.is_empty() {
            debug!("matrix fully served from cache");
            return matrix;
        }

        // A covering grid for a sparse miss set would re-fetch cached
        // pairs sitting at its intersections; those misses go through the
        // fallback chain one pair at a time instead.
        if missed_pairs.len() < missed_rows.len().saturating_mul(missed_columns.len()) {
            for (i, j) in missed_pairs {
                let Some((origin, destination)) = origins.get(i).zip(destinations.get(j)) else {
                    continue;
                };
                let cell = match self.manager.resolve(*origin, *destination, options).await {
                    Ok(result) => MatrixCell::Ok(result),
                    Err(error) => {
                        warn!("matrix pair {origin} -> {destination} failed: {error}");
                        MatrixCell::Failed(error.to_string())
                    }
                };
                matrix.set_cell(i, j, cell);
            }
            return matrix;
        }

        // The misses fill their covering grid exactly; fetch it in one
        // batched pass and merge the cells back by original index.
        let row_index: HashMap<usize, usize> = missed_rows
            .iter()
            .enumerate()
            .map(|(sub, &full)| (full, sub))
            .collect();
        let column_index: HashMap<usize, usize> = missed_columns
            .iter()
            .enumerate()
            .map(|(sub, &full)| (full, sub))
            .collect();
        let sub_origins: Vec<Coordinate> = missed_rows
            .iter()
            .filter_map(|&i| origins.get(i).copied())
            .collect();
        let sub_destinations: Vec<Coordinate> = missed_columns
            .iter()
            .filter_map(|&j| destinations.get(j).copied())
            .collect();

        let fresh = self.matrix(&sub_origins, &sub_destinations, options).await;
        for (i, j) in missed_pairs {
            let Some(cell) = row_index
                .get(&i)
                .zip(column_index.get(&j))
                .and_then(|(&sub_row, &sub_column)| fresh.cell(sub_row, sub_column))
            else {
                continue;
            };
            if let MatrixCell::Ok(result) = cell
                && let Some((origin, destination)) = origins.get(i).zip(destinations.get(j))
            {
                cache.put(*origin, *destination, options, result, VolatilityClass::of(result));
            }
            matrix.set_cell(i, j, cell.clone());
        }
        matrix
    }

    /// Resolve the distance from `origin` to every target.
    ///
    /// Targets are processed in bounded-concurrency windows with a fixed
    /// pause between windows. A failed target degrades to the
    /// infinite-distance sentinel; the batch always completes.
    pub async fn distances_from(
        &self,
        origin: Coordinate,
        targets: &[Coordinate],
        options: &DistanceOptions,
    ) -> BatchReport {
        let window = self.manager.config().window_size();
        let delay = self.manager.config().window_delay();
        let mut items = Vec::with_capacity(targets.len());
        let mut first = true;

        for chunk in targets.chunks(window) {
            if !first && !delay.is_zero() {
                sleep(delay).await;
            }
            first = false;
            let resolutions = chunk.iter().map(|&target| async move {
                match self.manager.resolve(origin, target, options).await {
                    Ok(result) => EnrichedTarget::resolved(target, result),
                    Err(error) => {
                        warn!("target {target} degraded to unreachable: {error}");
                        EnrichedTarget::unreachable(target)
                    }
                }
            });
            items.extend(join_all(resolutions).await);
        }
        BatchReport::from_items(items)
    }

    /// Enrich `items` with distances from `origin` and sort ascending.
    ///
    /// Unreachable items sort last; input order is preserved among equal
    /// distances.
    pub async fn sort_by_distance(
        &self,
        origin: Coordinate,
        items: &[Coordinate],
        options: &DistanceOptions,
    ) -> Vec<EnrichedTarget> {
        let mut enriched = self.distances_from(origin, items, options).await.items;
        enriched.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        enriched
    }
}

#[async_trait]
impl DistanceSource for DistanceService {
    async fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &DistanceOptions,
    ) -> Result<DistanceResult, DistanceError> {
        self.manager.resolve(origin, destination, options).await
    }
}

/// Mark a rectangular block of cells failed with one shared reason.
fn fail_block(
    matrix: &mut DistanceMatrix,
    row_offset: usize,
    rows: usize,
    column_offset: usize,
    columns: usize,
    reason: &str,
) {
    for i in 0..rows {
        for j in 0..columns {
            matrix.set_cell(
                row_offset + i,
                column_offset + j,
                MatrixCell::Failed(reason.to_owned()),
            );
        }
    }
}
