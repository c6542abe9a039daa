//! Retry backoff schedule.

use std::time::Duration;

/// Default number of download attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the second attempt.
pub const DEFAULT_BASE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Exponential backoff between download attempts.
///
/// Attempt 1 starts immediately; attempt `n >= 2` waits
/// `base_delay * 2^(n-2)`, i.e. 1x, 2x, 4x the base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_RETRY_DELAY,
        }
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait before `attempt` (1-based). Saturates instead of overflowing.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        2u32.checked_pow(attempt - 2)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Whether another attempt is allowed after `attempt` failed.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_delays_double() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(2));
        assert_eq!(policy.delay_before(3), Duration::from_secs(4));
        assert_eq!(policy.delay_before(4), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = BackoffPolicy::new(100, Duration::from_secs(1));
        assert_eq!(policy.delay_before(40), Duration::MAX);
        assert_eq!(policy.delay_before(u32::MAX), Duration::MAX);
    }

    #[test]
    fn test_allows_retry_after() {
        let policy = BackoffPolicy::new(3, Duration::from_millis(10));
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
    }
}
