//! Exact and greedy visiting-order search.

use log::debug;

use fieldroute_core::{
    Coordinate, DistanceOptions, DistanceSource, Objective, RouteError, RouteOptions, RouteSegment,
    RouteSolution, RouteStop,
};

use crate::memo::{EdgeMemo, edge_cost};

/// Largest stop set solved by exhaustive permutation search.
///
/// Five stops mean 120 tours over at most 30 unique edges; beyond that the
/// factorial blows up and greedy nearest-neighbour takes over.
pub const EXACT_SEARCH_LIMIT: usize = 5;

/// Orders stops into a route by minimising the configured objective.
///
/// Generic over any [`DistanceSource`], so the same search runs against
/// the full fallback engine in production and a geometric stub in tests.
pub struct RouteOptimizer<S> {
    source: S,
    distance_options: DistanceOptions,
}

impl<S: DistanceSource> RouteOptimizer<S> {
    /// Optimizer over `source` with default distance options.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self {
            source,
            distance_options: DistanceOptions::new(),
        }
    }

    /// Replace the distance options used for edge lookups.
    #[must_use]
    pub const fn with_distance_options(mut self, options: DistanceOptions) -> Self {
        self.distance_options = options;
        self
    }

    /// The distance source this optimizer queries.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Find a visiting order for `stops` beginning at `start`.
    ///
    /// Up to [`EXACT_SEARCH_LIMIT`] stops are solved exactly; larger sets
    /// greedily. Ties break deterministically towards the
    /// first-encountered candidate in both modes.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidInput`] for an empty stop set;
    /// [`RouteError::Unavailable`] when any required edge cannot be
    /// resolved.
    pub async fn optimize(
        &self,
        stops: &[RouteStop],
        start: Coordinate,
        options: &RouteOptions,
    ) -> Result<RouteSolution, RouteError> {
        if stops.is_empty() {
            return Err(RouteError::InvalidInput(
                "at least one stop is required".to_owned(),
            ));
        }
        let terminal = if options.return_to_start {
            Some(start)
        } else {
            options.end
        };
        let mut memo = EdgeMemo::new(&self.source, self.distance_options);

        let order = if stops.len() <= EXACT_SEARCH_LIMIT {
            debug!("exact search over {} stops", stops.len());
            exact_order(stops, start, terminal, options.objective, &mut memo).await?
        } else {
            debug!("greedy search over {} stops", stops.len());
            greedy_order(stops, start, options.objective, &mut memo).await?
        };

        assemble(stops, start, terminal, options, &order, &mut memo).await
    }
}

/// Exhaustive permutation search.
///
/// Every edge a permutation could use is fetched once up front; the
/// recursive enumeration then replays costs from the memo without touching
/// the distance layer again.
async fn exact_order<S: DistanceSource>(
    stops: &[RouteStop],
    start: Coordinate,
    terminal: Option<Coordinate>,
    objective: Objective,
    memo: &mut EdgeMemo<'_, S>,
) -> Result<Vec<usize>, RouteError> {
    for stop in stops {
        memo.edge(start, stop.location).await?;
    }
    for from in stops {
        for to in stops {
            memo.edge(from.location, to.location).await?;
        }
    }
    if let Some(terminal) = terminal {
        for stop in stops {
            memo.edge(stop.location, terminal).await?;
        }
    }

    let locations: Vec<Coordinate> = stops.iter().map(|stop| stop.location).collect();
    let mut order = Vec::with_capacity(locations.len());
    let mut used = vec![false; locations.len()];
    let mut best: Option<(f64, Vec<usize>)> = None;
    search(
        &locations, start, terminal, objective, memo, &mut order, &mut used, 0.0, &mut best,
    );
    best.map(|(_, order)| order).ok_or_else(|| {
        RouteError::InvalidInput("permutation search found no complete tour".to_owned())
    })
}

/// Recursive permutation enumerator.
///
/// Candidates are tried in ascending index order, and only a strictly
/// lower cost displaces the incumbent, so the first-encountered minimum
/// wins ties and the result is independent of timing.
#[expect(
    clippy::float_arithmetic,
    clippy::too_many_arguments,
    reason = "tour costs accumulate leg measurements; the recursion carries its whole state"
)]
fn search<S: DistanceSource>(
    locations: &[Coordinate],
    previous: Coordinate,
    terminal: Option<Coordinate>,
    objective: Objective,
    memo: &EdgeMemo<'_, S>,
    order: &mut Vec<usize>,
    used: &mut [bool],
    cost_so_far: f64,
    best: &mut Option<(f64, Vec<usize>)>,
) {
    if order.len() == locations.len() {
        let mut total = cost_so_far;
        if let Some(terminal) = terminal {
            let Some(closing) = memo.replay_cost(previous, terminal, objective) else {
                return;
            };
            total += closing;
        }
        if best.as_ref().is_none_or(|(incumbent, _)| total < *incumbent) {
            *best = Some((total, order.clone()));
        }
        return;
    }

    for index in 0..locations.len() {
        let (Some(flag), Some(&location)) = (used.get(index).copied(), locations.get(index))
        else {
            continue;
        };
        if flag {
            continue;
        }
        let Some(leg) = memo.replay_cost(previous, location, objective) else {
            continue;
        };
        if let Some(slot) = used.get_mut(index) {
            *slot = true;
        }
        order.push(index);
        search(
            locations,
            location,
            terminal,
            objective,
            memo,
            order,
            used,
            cost_so_far + leg,
            best,
        );
        order.pop();
        if let Some(slot) = used.get_mut(index) {
            *slot = false;
        }
    }
}

/// Greedy nearest-neighbour ordering.
///
/// Scans remaining stops in list order; strict comparison keeps the
/// earliest index on equal costs.
async fn greedy_order<S: DistanceSource>(
    stops: &[RouteStop],
    start: Coordinate,
    objective: Objective,
    memo: &mut EdgeMemo<'_, S>,
) -> Result<Vec<usize>, RouteError> {
    let mut remaining: Vec<usize> = (0..stops.len()).collect();
    let mut order = Vec::with_capacity(stops.len());
    let mut current = start;

    while !remaining.is_empty() {
        let mut nearest: Option<(usize, f64)> = None;
        for (position, &index) in remaining.iter().enumerate() {
            let Some(stop) = stops.get(index) else {
                continue;
            };
            let result = memo.edge(current, stop.location).await?;
            let cost = edge_cost(&result, objective);
            if nearest.is_none_or(|(_, incumbent)| cost < incumbent) {
                nearest = Some((position, cost));
            }
        }
        let Some((position, _)) = nearest else {
            break;
        };
        let index = remaining.remove(position);
        if let Some(stop) = stops.get(index) {
            current = stop.location;
        }
        order.push(index);
    }
    Ok(order)
}

/// Chain the chosen order into segments and rounded totals.
async fn assemble<S: DistanceSource>(
    stops: &[RouteStop],
    start: Coordinate,
    terminal: Option<Coordinate>,
    options: &RouteOptions,
    order: &[usize],
    memo: &mut EdgeMemo<'_, S>,
) -> Result<RouteSolution, RouteError> {
    let mut ordered = Vec::with_capacity(order.len());
    let mut segments = Vec::with_capacity(order.len().saturating_add(1));
    let mut previous = start;

    for &index in order {
        let stop = stops.get(index).ok_or_else(|| {
            RouteError::InvalidInput(format!("stop index {index} out of range"))
        })?;
        let result = memo.edge(previous, stop.location).await?;
        segments.push(RouteSegment {
            from: previous,
            to: stop.location,
            distance_meters: result.distance_meters,
            duration_seconds: result.effective_duration_seconds(),
            is_return: false,
        });
        ordered.push(stop.clone());
        previous = stop.location;
    }
    if let Some(terminal) = terminal {
        let result = memo.edge(previous, terminal).await?;
        segments.push(RouteSegment {
            from: previous,
            to: terminal,
            distance_meters: result.distance_meters,
            duration_seconds: result.effective_duration_seconds(),
            is_return: options.return_to_start,
        });
    }
    Ok(RouteSolution::from_segments(ordered, segments))
}
