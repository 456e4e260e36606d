//! Retry policy with exponential backoff.
//!
//! The backoff schedule is deterministic: the number of attempts a step
//! makes and the intervals between them are fixed by the policy alone.

use std::time::Duration;

/// Backoff and attempt-ceiling parameters applied per step.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Backoff before the second attempt.
    pub initial_interval: Duration,
    /// Multiplicative growth per attempt.
    pub backoff_coefficient: f64,
    /// Cap on the computed backoff.
    pub maximum_interval: Duration,
    /// Hard ceiling on attempts per step, including the first.
    pub maximum_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(60),
            maximum_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial interval.
    #[must_use]
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Sets the backoff coefficient.
    #[must_use]
    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    /// Sets the maximum interval.
    #[must_use]
    pub fn with_maximum_interval(mut self, interval: Duration) -> Self {
        self.maximum_interval = interval;
        self
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_maximum_attempts(mut self, attempts: u32) -> Self {
        self.maximum_attempts = attempts;
        self
    }

    /// Backoff to wait after failed `attempt` (1-indexed), or `None` when
    /// no attempts remain.
    ///
    /// Attempt *n* waits `min(maximum_interval, initial_interval *
    /// backoff_coefficient^(n-1))`. A ceiling of zero still permits the
    /// initial attempt; it only forbids retries.
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.maximum_attempts {
            return None;
        }

        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let grown = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let capped = grown.min(self.maximum_interval.as_secs_f64());
        Some(Duration::from_secs_f64(capped.max(0.0)))
    }

    /// Returns the attempt ceiling.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.maximum_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_secs(1));
        assert_eq!(policy.maximum_interval, Duration::from_secs(60));
        assert_eq!(policy.maximum_attempts, 3);
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_secs(1))
            .with_maximum_attempts(5);

        assert_eq!(policy.backoff_for_attempt(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.backoff_for_attempt(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.backoff_for_attempt(3), Some(Duration::from_secs(4)));
        assert_eq!(policy.backoff_for_attempt(4), Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_backoff_capped_at_maximum_interval() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_secs(1))
            .with_maximum_interval(Duration::from_secs(10))
            .with_maximum_attempts(20);

        // 2^6 = 64 seconds, capped at 10.
        assert_eq!(policy.backoff_for_attempt(7), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_attempts_exhausted() {
        let policy = RetryPolicy::new().with_maximum_attempts(3);

        assert!(policy.backoff_for_attempt(1).is_some());
        assert!(policy.backoff_for_attempt(2).is_some());
        assert_eq!(policy.backoff_for_attempt(3), None);
    }

    #[test]
    fn test_zero_ceiling_forbids_retries_only() {
        let policy = RetryPolicy::new().with_maximum_attempts(0);
        assert_eq!(policy.backoff_for_attempt(1), None);
    }

    #[test]
    fn test_builder() {
        let policy = RetryPolicy::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_backoff_coefficient(3.0)
            .with_maximum_interval(Duration::from_secs(30))
            .with_maximum_attempts(7);

        assert_eq!(policy.initial_interval, Duration::from_millis(500));
        assert_eq!(policy.backoff_coefficient, 3.0);
        assert_eq!(policy.maximum_interval, Duration::from_secs(30));
        assert_eq!(policy.max_attempts(), 7);
    }
}
