//! Provider fallback, quota enforcement, and matrix orchestration.
//!
//! [`DistanceService`] is the engine's front door: single-pair queries run
//! through the quota-aware [`FallbackManager`], oversized matrices are
//! chunked to provider caps, and bulk enrichment degrades per item rather
//! than per batch. The service is explicitly constructed from its
//! collaborators; there is no global instance.

#![forbid(unsafe_code)]

mod config;
mod enrich;
mod fallback;
mod service;

pub use config::{DailyLimits, EngineConfig};
pub use enrich::{BatchReport, EnrichedTarget};
pub use fallback::{FallbackManager, ProviderProbe};
pub use service::DistanceService;
