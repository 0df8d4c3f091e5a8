//! Retry policy for API requests.
//!
//! Only retries that cannot duplicate side effects are allowed: 429 is
//! always retried, 5xx and transport failures only for GET/HEAD/OPTIONS.

use std::time::Duration;

use rand::Rng;
use reqwest::Method;

use crate::idempotency::is_idempotent;

/// When and how long to wait before resending a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay (before jitter).
    pub max_backoff: Duration,
    /// Multiply each delay by a random factor in `[0.5, 1.5)`.
    pub jitter: bool,
}

impl RetryConfig {
    /// Creates a policy with `max_retries` and default backoff.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Sets the initial delay.
    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Sets the delay cap.
    pub fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Decides whether a response with `status` deserves another attempt.
    ///
    /// `attempt` is zero-based: the first request is attempt 0.
    pub fn should_retry(&self, status: u16, method: &Method, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        status == 429 || (status >= 500 && is_idempotent(method))
    }

    /// Decides whether a request that failed before producing a response
    /// deserves another attempt.
    pub fn should_retry_transport_error(&self, method: &Method, attempt: u32) -> bool {
        attempt < self.max_retries && is_idempotent(method)
    }

    /// `min(initial * 2^attempt, max)`, without jitter.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        1u32.checked_shl(attempt)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Delay before the next attempt. A server-provided `Retry-After` wins
    /// over the computed backoff, capped at `max_backoff`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(delay) => delay.min(self.max_backoff),
            None => self.backoff(attempt),
        }
    }

    /// Delay to wait after `attempt` failed, with jitter applied if enabled.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_backoff(attempt);
        if !self.jitter {
            return base;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.5..1.5);
        base.mul_f64(factor)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            jitter: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.max_backoff, Duration::from_secs(30));
        assert!(config.jitter);
    }

    #[test]
    fn test_should_retry_table() {
        let config = RetryConfig::default();
        let cases: &[(u16, Method, u32, bool)] = &[
            (429, Method::GET, 0, true),
            (429, Method::POST, 0, true),
            (429, Method::GET, 3, false),
            (500, Method::GET, 0, true),
            (502, Method::GET, 0, true),
            (503, Method::HEAD, 2, true),
            (500, Method::OPTIONS, 1, true),
            (500, Method::POST, 0, false),
            (503, Method::PUT, 0, false),
            (500, Method::DELETE, 0, false),
            (500, Method::PATCH, 0, false),
            (500, Method::GET, 3, false),
            (400, Method::GET, 0, false),
            (401, Method::GET, 0, false),
            (404, Method::GET, 0, false),
            (200, Method::GET, 0, false),
            (304, Method::GET, 0, false),
        ];
        for (status, method, attempt, expected) in cases {
            assert_eq!(
                config.should_retry(*status, method, *attempt),
                *expected,
                "({status}, {method}, {attempt})"
            );
        }
    }

    #[test]
    fn test_no_retry_never_retries() {
        let config = RetryConfig::no_retry();
        assert!(!config.should_retry(429, &Method::GET, 0));
        assert!(!config.should_retry_transport_error(&Method::GET, 0));
    }

    #[test]
    fn test_transport_errors_retry_only_idempotent() {
        let config = RetryConfig::default();
        assert!(config.should_retry_transport_error(&Method::GET, 0));
        assert!(!config.should_retry_transport_error(&Method::POST, 0));
        assert!(!config.should_retry_transport_error(&Method::GET, 3));
    }

    #[test]
    fn test_exponential_backoff() {
        let config = RetryConfig::default().with_jitter(false);
        assert_eq!(config.backoff(0), Duration::from_secs(1));
        assert_eq!(config.backoff(1), Duration::from_secs(2));
        assert_eq!(config.backoff(2), Duration::from_secs(4));
        assert_eq!(config.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_max_delay_cap() {
        let config = RetryConfig::new(10).with_jitter(false);
        assert_eq!(config.backoff(5), Duration::from_secs(30));
        assert_eq!(config.backoff(40), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig::default();
        for attempt in 0..8 {
            let base = config.base_backoff(attempt);
            let low = base.mul_f64(0.5);
            let high = base.mul_f64(1.5);
            for _ in 0..200 {
                let delay = config.backoff(attempt);
                assert!(delay >= low && delay < high, "{attempt}: {delay:?}");
            }
        }
    }

    #[test]
    fn test_retry_after_overrides_backoff() {
        let config = RetryConfig::new(3)
            .with_initial_backoff(Duration::from_secs(2))
            .with_max_backoff(Duration::from_secs(10))
            .with_jitter(false);
        assert_eq!(config.delay_for(0, None), Duration::from_secs(2));
        assert_eq!(
            config.delay_for(0, Some(Duration::from_secs(4))),
            Duration::from_secs(4)
        );
        assert_eq!(
            config.delay_for(0, Some(Duration::from_secs(600))),
            Duration::from_secs(10)
        );
    }
}
