//! Capped exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::error::{QueryError, Result};

/// Default number of transient failures tolerated before giving up.
pub const DEFAULT_MAX_RETRY_COUNT: usize = 6;

/// Default cap on a single retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Jitter factors are drawn uniformly from this range.
const JITTER_MIN: f64 = 1.0;
const JITTER_MAX: f64 = 1.1;

/// When and how long to wait between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Transient failures after which the strategy gives up.
    pub max_retry_count: usize,
    pub max_delay: Duration,
    /// Multiplier applied to `base^attempt - 1`.
    pub coefficient: Duration,
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            max_delay: DEFAULT_MAX_DELAY,
            coefficient: Duration::from_secs(1),
            exponential_base: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy with the default backoff shape.
    ///
    /// Negative values come from configuration and are rejected with
    /// [`QueryError::InvalidRetryPolicy`].
    pub fn new(max_retry_count: i64, max_delay_ms: i64) -> Result<Self> {
        if max_retry_count < 0 {
            return Err(QueryError::InvalidRetryPolicy(format!(
                "max_retry_count must not be negative, got {}",
                max_retry_count
            )));
        }
        if max_delay_ms < 0 {
            return Err(QueryError::InvalidRetryPolicy(format!(
                "max_delay_ms must not be negative, got {}",
                max_delay_ms
            )));
        }
        Ok(Self {
            max_retry_count: max_retry_count as usize,
            max_delay: Duration::from_millis(max_delay_ms as u64),
            ..Self::default()
        })
    }

    pub fn with_coefficient(mut self, coefficient: Duration) -> Self {
        self.coefficient = coefficient;
        self
    }

    pub fn with_exponential_base(mut self, exponential_base: f64) -> Self {
        self.exponential_base = exponential_base;
        self
    }

    /// Reject a base that would not grow the delay.
    pub fn validate(&self) -> Result<()> {
        if !self.exponential_base.is_finite() || self.exponential_base < 1.0 {
            return Err(QueryError::InvalidRetryPolicy(format!(
                "exponential_base must be at least 1, got {}",
                self.exponential_base
            )));
        }
        Ok(())
    }

    /// Delay before retrying failure number `attempt` (zero-based), for a
    /// given jitter factor.
    pub fn delay_for(&self, attempt: usize, jitter: f64) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = (self.exponential_base.powi(exponent) - 1.0) * jitter;
        let secs = self.coefficient.as_secs_f64() * factor;
        let max = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= max {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// [`delay_for`](Self::delay_for) with a random jitter factor.
    pub fn next_delay(&self, attempt: usize) -> Duration {
        let jitter = rand::rng().random_range(JITTER_MIN..JITTER_MAX);
        self.delay_for(attempt, jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retry_count, 6);
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.coefficient, Duration::from_secs(1));
        assert_eq!(policy.exponential_base, 2.0);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_delay_progression() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0, 1.0), Duration::ZERO);
        assert_eq!(policy.delay_for(1, 1.0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2, 1.0), Duration::from_secs(3));
        assert_eq!(policy.delay_for(3, 1.0), Duration::from_secs(7));
        assert_eq!(policy.delay_for(4, 1.0), Duration::from_secs(15));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(5, 1.0), Duration::from_secs(30));
        assert_eq!(policy.delay_for(60, 1.09), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.next_delay(2);
            assert!(delay >= Duration::from_secs(3));
            assert!(delay < Duration::from_secs_f64(3.3 + 1e-9));
        }
    }

    #[test]
    fn test_negative_values_rejected() {
        assert!(matches!(
            RetryPolicy::new(-1, 1000),
            Err(QueryError::InvalidRetryPolicy(_))
        ));
        assert!(matches!(
            RetryPolicy::new(3, -5),
            Err(QueryError::InvalidRetryPolicy(_))
        ));

        let policy = RetryPolicy::new(3, 500).unwrap();
        assert_eq!(policy.max_retry_count, 3);
        assert_eq!(policy.max_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_base_below_one_rejected() {
        let policy = RetryPolicy::default().with_exponential_base(0.5);
        assert!(policy.validate().is_err());
    }
}
