//! Bounded exponential backoff for transient transport failures.

use std::time::Duration;

/// Retry schedule: a fixed attempt count with a doubling delay.
///
/// Only transport-level failures are retried; quota, validation, and
/// no-route outcomes fail immediately (see
/// [`fieldroute_core::DistanceError::is_transient`]).
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use fieldroute_providers::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.delay_before(1), Some(Duration::from_millis(500)));
/// assert_eq!(policy.delay_before(2), Some(Duration::from_millis(1000)));
/// assert_eq!(policy.delay_before(3), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before attempt number `attempt` (zero-based: attempt
    /// 0 is the initial call and has no delay). `None` once the attempt
    /// budget is spent.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        Some(self.base_delay.saturating_mul(factor))
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    #[must_use]
    pub const fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, None)]
    #[case(1, Some(Duration::from_millis(500)))]
    #[case(2, Some(Duration::from_millis(1000)))]
    #[case(3, None)]
    #[case(10, None)]
    fn backoff_schedule(#[case] attempt: u32, #[case] expected: Option<Duration>) {
        assert_eq!(RetryPolicy::default().delay_before(attempt), expected);
    }

    #[test]
    fn budget_is_inclusive_of_first_attempt() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
    }
}
