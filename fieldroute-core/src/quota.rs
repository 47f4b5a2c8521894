//! Daily per-provider quota counters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ProviderId;

/// Usage counters for one provider on one calendar day.
///
/// The date is part of the identity, so counters roll over automatically at
/// midnight and historical rows persist for reporting. The daily limit
/// itself is configuration, not state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCounter {
    /// Provider the counters belong to.
    pub provider: ProviderId,
    /// Calendar day the counters cover.
    pub date: NaiveDate,
    /// Successful requests recorded that day.
    pub request_count: u32,
    /// Failed requests recorded that day.
    pub failure_count: u32,
}

impl QuotaCounter {
    /// A zeroed counter for the given provider and day.
    #[must_use]
    pub const fn zero(provider: ProviderId, date: NaiveDate) -> Self {
        Self {
            provider,
            date,
            request_count: 0,
            failure_count: 0,
        }
    }

    /// Whether the daily ceiling is reached. A limit of zero means
    /// unlimited.
    #[must_use]
    pub const fn is_exhausted(&self, daily_limit: u32) -> bool {
        daily_limit != 0 && self.request_count >= daily_limit
    }
}

/// Persistent, atomically incremented daily counters.
///
/// Increments must be atomic (upsert-style), never read-modify-write, so
/// concurrent in-flight requests cannot lose updates. Counters are only
/// ever consulted for the current day; past rows are history.
pub trait QuotaStore: Send + Sync {
    /// Atomically add one successful request for `provider` on `date`.
    fn record_success(&self, provider: ProviderId, date: NaiveDate);

    /// Atomically add one failed request for `provider` on `date`.
    fn record_failure(&self, provider: ProviderId, date: NaiveDate);

    /// Counters for `provider` on `date`; zeroed when nothing is recorded.
    fn usage(&self, provider: ProviderId, date: NaiveDate) -> QuotaCounter;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid test date")
    }

    #[test]
    fn zero_limit_is_unlimited() {
        let mut counter = QuotaCounter::zero(ProviderId::MatrixApi, day());
        counter.request_count = u32::MAX;
        assert!(!counter.is_exhausted(0));
    }

    #[test]
    fn exhaustion_at_the_limit() {
        let mut counter = QuotaCounter::zero(ProviderId::MatrixApi, day());
        counter.request_count = 99;
        assert!(!counter.is_exhausted(100));
        counter.request_count = 100;
        assert!(counter.is_exhausted(100));
    }
}
