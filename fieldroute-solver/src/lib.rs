//! Visiting-order optimisation over a [`DistanceSource`].
//!
//! Small stop sets are solved exactly by bounded permutation search; larger
//! ones fall back to greedy nearest-neighbour. Both paths share an edge
//! memo so no unique origin/destination pair hits the distance layer more
//! than once per optimisation.
//!
//! [`DistanceSource`]: fieldroute_core::DistanceSource

#![forbid(unsafe_code)]

mod memo;
mod optimizer;

pub use optimizer::{EXACT_SEARCH_LIMIT, RouteOptimizer};
