//! Shared stubs for exercising the engine without real providers.
//!
//! Deliberately minimal: scripted outcomes, plane-geometry distances, and
//! call counting. Not part of the public API surface.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{
    BatchLimits, ConnectionStatus, Coordinate, DistanceError, DistanceMatrix, DistanceOptions,
    DistanceProvider, DistanceResult, DistanceSource, MatrixCell, ProviderId,
};

/// A provider that replays a scripted queue of outcomes.
///
/// When the queue empties, the configured default result answers (if any);
/// otherwise a network error does. Counts single and matrix calls so tests
/// can assert exactly who was attempted.
pub struct ScriptedProvider {
    id: ProviderId,
    limits: BatchLimits,
    cost: u32,
    outcomes: Mutex<VecDeque<Result<DistanceResult, DistanceError>>>,
    default_result: Option<DistanceResult>,
    calls: AtomicUsize,
    matrix_calls: AtomicUsize,
}

impl ScriptedProvider {
    /// A provider that always succeeds with `result` once its queue is
    /// empty (and immediately, if no outcomes are scripted).
    #[must_use]
    pub fn succeeding(id: ProviderId, result: DistanceResult) -> Self {
        Self {
            id,
            limits: BatchLimits::new(100, 100),
            cost: 0,
            outcomes: Mutex::new(VecDeque::new()),
            default_result: Some(result),
            calls: AtomicUsize::new(0),
            matrix_calls: AtomicUsize::new(0),
        }
    }

    /// A provider that always fails with a network error.
    #[must_use]
    pub fn failing(id: ProviderId) -> Self {
        Self {
            id,
            limits: BatchLimits::new(100, 100),
            cost: 0,
            outcomes: Mutex::new(VecDeque::new()),
            default_result: None,
            calls: AtomicUsize::new(0),
            matrix_calls: AtomicUsize::new(0),
        }
    }

    /// Queue explicit outcomes consumed before the default applies.
    #[must_use]
    pub fn with_outcomes(
        self,
        outcomes: impl IntoIterator<Item = Result<DistanceResult, DistanceError>>,
    ) -> Self {
        {
            let mut queue = lock_unpoisoned(&self.outcomes);
            queue.extend(outcomes);
        }
        self
    }

    /// Override the batch caps.
    #[must_use]
    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Override the per-request cost units.
    #[must_use]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Single-pair calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Matrix calls made so far.
    #[must_use]
    pub fn matrix_calls(&self) -> usize {
        self.matrix_calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Result<DistanceResult, DistanceError> {
        let mut queue = lock_unpoisoned(&self.outcomes);
        if let Some(outcome) = queue.pop_front() {
            return outcome;
        }
        self.default_result.clone().ok_or(DistanceError::Network {
            provider: self.id,
            message: "scripted failure".to_owned(),
        })
    }
}

#[async_trait]
impl DistanceProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn cost_per_request(&self) -> u32 {
        self.cost
    }

    fn batch_limits(&self) -> BatchLimits {
        self.limits
    }

    async fn distance(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
        _options: &DistanceOptions,
    ) -> Result<DistanceResult, DistanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.next_outcome()
    }

    async fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        _options: &DistanceOptions,
    ) -> Result<DistanceMatrix, DistanceError> {
        self.matrix_calls.fetch_add(1, Ordering::SeqCst);
        if !self
            .limits
            .admits(origins.len(), destinations.len())
        {
            return Err(DistanceError::InvalidInput(format!(
                "matrix {}x{} exceeds caps {}x{}",
                origins.len(),
                destinations.len(),
                self.limits.max_origins,
                self.limits.max_destinations
            )));
        }
        let mut matrix = DistanceMatrix::empty(origins.to_vec(), destinations.to_vec());
        for row in 0..origins.len() {
            for column in 0..destinations.len() {
                matrix.set_cell(row, column, MatrixCell::Ok(self.next_outcome()?));
            }
        }
        Ok(matrix)
    }

    async fn test_connection(&self) -> ConnectionStatus {
        ConnectionStatus::Ok { latency_ms: 0 }
    }
}

/// Distance source backed by plane geometry.
///
/// One degree maps to `meters_per_degree`; duration assumes a constant
/// speed. Pairs listed as unreachable fail with `NoRoute`. Counts calls so
/// memoisation tests can bound provider traffic.
pub struct PlanarSource {
    meters_per_degree: f64,
    speed_mps: f64,
    unreachable: Vec<(String, String)>,
    calls: AtomicUsize,
}

impl PlanarSource {
    /// A source where one degree is 100 km and travel runs at 20 m/s.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            meters_per_degree: 100_000.0,
            speed_mps: 20.0,
            unreachable: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Mark a directed pair as unroutable.
    #[must_use]
    pub fn with_unreachable(mut self, from: Coordinate, to: Coordinate) -> Self {
        self.unreachable.push((from.key(), to.key()));
        self
    }

    /// Single-pair calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for PlanarSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DistanceSource for PlanarSource {
    #[expect(
        clippy::float_arithmetic,
        reason = "plane-geometry stub distance is floating point by nature"
    )]
    async fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _options: &DistanceOptions,
    ) -> Result<DistanceResult, DistanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let pair = (origin.key(), destination.key());
        if self
            .unreachable
            .iter()
            .any(|(from, to)| *from == pair.0 && *to == pair.1)
        {
            return Err(DistanceError::NoRoute {
                from: origin,
                to: destination,
            });
        }
        let dx = destination.lng - origin.lng;
        let dy = destination.lat - origin.lat;
        let meters = (dx * dx + dy * dy).sqrt() * self.meters_per_degree;
        Ok(DistanceResult::new(
            meters,
            meters / self.speed_mps,
            ProviderId::Approximation,
            0,
        ))
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
