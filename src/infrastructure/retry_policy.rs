//! Retry policy for page fetches
//!
//! The policy decides whether a failed attempt is retried and how long to wait
//! first. It knows nothing about the transport; `RateLimitedFetcher` drives it.

use std::time::Duration;

use crate::infrastructure::config::RetryConfig;
use crate::infrastructure::fetch_error::FetchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Fixed wait after HTTP 429
    pub throttle_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.min_delay_ms)),
            throttle_delay: Duration::from_millis(config.throttle_delay_ms),
        }
    }

    /// Policy that retries immediately, for tests and local fixtures
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            throttle_delay: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// 404/410 will not change on retry; configuration errors never do.
    pub fn is_retryable(&self, error: &FetchError) -> bool {
        match error {
            FetchError::Status { status, .. } => !matches!(status, 404 | 410),
            FetchError::Config { .. } | FetchError::RetriesExhausted { .. } => false,
            FetchError::Throttled { .. } | FetchError::Transport { .. } | FetchError::EmptyBody { .. } => true,
        }
    }

    /// Whether another attempt is allowed after `attempts_made` failures of `error`
    pub fn should_retry(&self, error: &FetchError, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts() && self.is_retryable(error)
    }

    /// Wait before the next attempt: fixed after throttling, jittered otherwise
    pub fn delay_for(&self, error: &FetchError) -> Duration {
        if error.is_throttled() {
            return self.throttle_delay;
        }
        self.jittered_delay()
    }

    /// Uniform in `[min_delay, max_delay]`
    pub fn jittered_delay(&self) -> Duration {
        let min = u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(fastrand::u64(min..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn status(code: u16) -> FetchError {
        FetchError::from_status(code, "https://letterboxd.com/film/alien/")
    }

    #[rstest]
    #[case(status(429), true)]
    #[case(status(500), true)]
    #[case(status(503), true)]
    #[case(status(403), true)]
    #[case(status(404), false)]
    #[case(status(410), false)]
    #[case(FetchError::Config { message: "bad header".into() }, false)]
    fn retryable_classification(#[case] error: FetchError, #[case] expected: bool) {
        assert_eq!(RetryPolicy::default().is_retryable(&error), expected);
    }

    #[test]
    fn attempts_are_bounded() {
        let policy = RetryPolicy::immediate(3);
        let err = status(503);
        assert!(policy.should_retry(&err, 1));
        assert!(policy.should_retry(&err, 3));
        assert!(!policy.should_retry(&err, 4));
    }

    #[test]
    fn throttling_waits_the_fixed_delay() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_retries: 3,
            min_delay_ms: 100,
            max_delay_ms: 200,
            throttle_delay_ms: 7000,
        });
        assert_eq!(policy.delay_for(&status(429)), Duration::from_millis(7000));

        for _ in 0..50 {
            let delay = policy.delay_for(&status(502));
            assert!(delay >= Duration::from_millis(100) && delay <= Duration::from_millis(200));
        }
    }
}
