//! Cache and quota persistence for the Fieldroute distance engine.
//!
//! Two concerns live here, both behind the seams defined in
//! `fieldroute-core`:
//!
//! - the two-tier distance cache — a bounded in-process tier
//!   ([`MemoryDistanceCache`]) in front of a durable SQLite tier
//!   ([`SqliteDistanceCache`]), combined by [`TieredDistanceCache`];
//! - daily per-provider quota counters ([`SqliteQuotaStore`],
//!   [`MemoryQuotaStore`]) with atomic upsert increments.
//!
//! The backing medium is deliberately swappable: everything upstream only
//! sees the `DistanceCache` and `QuotaStore` traits.

#![forbid(unsafe_code)]

mod cache;
mod error;
mod quota;

pub use cache::{CacheTtls, MemoryDistanceCache, SqliteDistanceCache, TieredDistanceCache};
pub use error::StoreError;
pub use quota::{MemoryQuotaStore, SqliteQuotaStore};
