//! Daily per-provider quota counters.
//!
//! Counters are keyed by `(provider, date)`, so rollover at midnight is a
//! property of the key, not of any scheduled job, and past days persist
//! for reporting. Increments are atomic upserts; there is no
//! read-modify-write anywhere.

mod sqlite;

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use fieldroute_core::{ProviderId, QuotaCounter, QuotaStore};

use super::cache::lock_unpoisoned;

pub use sqlite::SqliteQuotaStore;

/// In-memory quota counters for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryQuotaStore {
    counters: Mutex<HashMap<(ProviderId, NaiveDate), (u32, u32)>>,
}

impl MemoryQuotaStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn record_success(&self, provider: ProviderId, date: NaiveDate) {
        let mut counters = lock_unpoisoned(&self.counters);
        let slot = counters.entry((provider, date)).or_insert((0, 0));
        slot.0 = slot.0.saturating_add(1);
    }

    fn record_failure(&self, provider: ProviderId, date: NaiveDate) {
        let mut counters = lock_unpoisoned(&self.counters);
        let slot = counters.entry((provider, date)).or_insert((0, 0));
        slot.1 = slot.1.saturating_add(1);
    }

    fn usage(&self, provider: ProviderId, date: NaiveDate) -> QuotaCounter {
        let counters = lock_unpoisoned(&self.counters);
        let (request_count, failure_count) = counters
            .get(&(provider, date))
            .copied()
            .unwrap_or((0, 0));
        QuotaCounter {
            provider,
            date,
            request_count,
            failure_count,
        }
    }
}
