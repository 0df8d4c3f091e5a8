//! Circuit breaker guarding the API.
//!
//! After `failure_threshold` consecutive failures the breaker opens and
//! refuses calls for `cooldown`. The first call after the cooldown is let
//! through as the only trial: success closes the breaker, failure re-opens
//! it. Other callers are refused until the trial resolves.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use notte_core::ApiError;
use tracing::{debug, warn};

/// Source of the current time. Injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// ============================================================================
// Configuration
// ============================================================================

/// Thresholds for [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are refused until the given instant.
    Open {
        /// End of the cooldown.
        until: DateTime<Utc>,
    },
    /// Cooldown elapsed; a trial request is in flight.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    consecutive_failures: u32,
    state: CircuitState,
    /// End of the most recent cooldown, reported while a trial is pending.
    last_open_until: Option<DateTime<Utc>>,
    trial_in_flight: bool,
}

/// Consecutive-failure circuit breaker.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    clock: Clock,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    /// Creates a closed breaker using the wall clock.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(Utc::now))
    }

    /// Creates a closed breaker reading time from `clock`.
    pub fn with_clock(config: CircuitBreakerConfig, clock: Clock) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState {
                consecutive_failures: 0,
                state: CircuitState::Closed,
                last_open_until: None,
                trial_in_flight: false,
            }),
            clock,
        }
    }

    /// The configured thresholds.
    pub fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Failures recorded since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Returns true when a request may be sent.
    ///
    /// While open and inside the cooldown this is a pure read. Once the
    /// cooldown has elapsed the breaker moves to half-open and lets exactly
    /// one caller through as the trial. A caller that is let through must
    /// report back with [`record_success`](Self::record_success),
    /// [`record_failure`](Self::record_failure) or
    /// [`record_abandoned`](Self::record_abandoned).
    pub fn allow(&self) -> bool {
        self.check().is_ok()
    }

    /// Like [`allow`](Self::allow), returning the refusal as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::CircuitOpen`] while the cooldown is running or
    /// while another caller's trial is unresolved.
    pub fn check(&self) -> Result<(), ApiError> {
        self.admit().map(|_| ())
    }

    /// Admits a call. `Ok(true)` means the caller holds the half-open trial
    /// and is the one expected to call [`record_abandoned`](Self::record_abandoned)
    /// if it ends without an outcome.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub fn admit(&self) -> Result<bool, ApiError> {
        let mut guard = self.lock();
        match guard.state {
            CircuitState::Closed => Ok(false),
            CircuitState::HalfOpen if guard.trial_in_flight => Err(ApiError::CircuitOpen {
                open_until: guard.last_open_until.unwrap_or_else(|| (self.clock)()),
            }),
            CircuitState::HalfOpen => {
                debug!("circuit breaker allowing replacement trial");
                guard.trial_in_flight = true;
                Ok(true)
            }
            CircuitState::Open { until } => {
                if (self.clock)() < until {
                    return Err(ApiError::CircuitOpen { open_until: until });
                }
                debug!("circuit breaker cooldown elapsed, allowing trial");
                guard.state = CircuitState::HalfOpen;
                guard.trial_in_flight = true;
                Ok(true)
            }
        }
    }

    /// Whether a half-open trial is currently unresolved.
    pub fn trial_in_flight(&self) -> bool {
        self.lock().trial_in_flight
    }

    /// Records a successful call: resets the count and closes the breaker.
    pub fn record_success(&self) {
        let mut guard = self.lock();
        if guard.state != CircuitState::Closed {
            debug!("circuit breaker closed");
        }
        guard.consecutive_failures = 0;
        guard.state = CircuitState::Closed;
        guard.trial_in_flight = false;
    }

    /// Releases the half-open trial held by a call that ended without an
    /// outcome, such as a cancelled request, so another caller can take its place.
    /// Only the caller that [`admit`](Self::admit) marked as the trial
    /// should call this.
    pub fn record_abandoned(&self) {
        let mut guard = self.lock();
        if guard.trial_in_flight {
            debug!("circuit breaker trial abandoned");
            guard.trial_in_flight = false;
        }
    }

    /// Records a failed call, opening the breaker at the threshold or when a
    /// half-open trial fails.
    pub fn record_failure(&self) {
        let mut guard = self.lock();
        guard.consecutive_failures = guard.consecutive_failures.saturating_add(1);
        guard.trial_in_flight = false;

        let trial_failed = guard.state == CircuitState::HalfOpen;
        if !trial_failed && guard.consecutive_failures < self.config.failure_threshold {
            return;
        }

        let cooldown = chrono::Duration::from_std(self.config.cooldown)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        let until = (self.clock)() + cooldown;
        warn!(
            failures = guard.consecutive_failures,
            open_until = %until,
            "circuit breaker opened"
        );
        guard.state = CircuitState::Open { until };
        guard.last_open_until = Some(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Manually advanced clock.
    struct FakeClock {
        millis: AtomicI64,
    }

    impl FakeClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                millis: AtomicI64::new(1_700_000_000_000),
            })
        }

        fn advance(&self, by: Duration) {
            let ms = i64::try_from(by.as_millis()).unwrap();
            self.millis.fetch_add(ms, Ordering::SeqCst);
        }
    }

    fn clock_of(fake: &Arc<FakeClock>) -> Clock {
        let fake = Arc::clone(fake);
        Arc::new(move || {
            DateTime::from_timestamp_millis(fake.millis.load(Ordering::SeqCst)).unwrap()
        })
    }

    fn breaker(threshold: u32, cooldown: Duration) -> (CircuitBreaker, Arc<FakeClock>) {
        let clock = FakeClock::new();
        let breaker = CircuitBreaker::with_clock(
            CircuitBreakerConfig {
                failure_threshold: threshold,
                cooldown,
            },
            clock_of(&clock),
        );
        (breaker, clock)
    }

    #[test]
    fn test_defaults() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.cooldown, Duration::from_secs(30));
        assert_eq!(CircuitBreaker::default().state(), CircuitState::Closed);
    }

    #[test]
    fn test_opens_at_threshold() {
        let (breaker, _clock) = breaker(3, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allow());
        breaker.record_failure();
        assert!(matches!(breaker.state(), CircuitState::Open { .. }));
        assert!(!breaker.allow());
    }

    #[test]
    fn test_success_resets_count() {
        let (breaker, _clock) = breaker(2, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.consecutive_failures(), 1);
        assert!(breaker.allow());
    }

    #[test]
    fn test_refusal_does_not_mutate() {
        let (breaker, clock) = breaker(1, Duration::from_secs(10));
        breaker.record_failure();
        let before = breaker.state();
        for _ in 0..5 {
            clock.advance(Duration::from_secs(1));
            assert!(!breaker.allow());
        }
        assert_eq!(breaker.state(), before);
        assert_eq!(breaker.consecutive_failures(), 1);
    }

    #[test]
    fn test_check_reports_open_until() {
        let (breaker, _clock) = breaker(1, Duration::from_secs(10));
        breaker.record_failure();
        let CircuitState::Open { until } = breaker.state() else {
            panic!("expected open breaker");
        };
        assert_eq!(
            breaker.check(),
            Err(ApiError::CircuitOpen { open_until: until })
        );
    }

    #[test]
    fn test_half_open_trial_success_closes() {
        let (breaker, clock) = breaker(2, Duration::from_secs(10));
        breaker.record_failure();
        breaker.record_failure();
        clock.advance(Duration::from_secs(10));
        assert!(breaker.allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn test_half_open_trial_failure_reopens() {
        let (breaker, clock) = breaker(3, Duration::from_secs(10));
        for _ in 0..3 {
            breaker.record_failure();
        }
        clock.advance(Duration::from_secs(11));
        assert!(breaker.allow());
        breaker.record_failure();
        assert!(matches!(breaker.state(), CircuitState::Open { .. }));
        assert!(!breaker.allow());
    }

    #[test]
    fn test_half_open_admits_single_trial() {
        let (breaker, clock) = breaker(1, Duration::from_secs(1));
        breaker.record_failure();
        clock.advance(Duration::from_secs(2));

        assert!(breaker.allow());
        assert!(!breaker.allow());
        assert!(matches!(
            breaker.check(),
            Err(ApiError::CircuitOpen { .. })
        ));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.trial_in_flight());

        breaker.record_success();
        assert!(!breaker.trial_in_flight());
        assert!(breaker.allow());
        assert!(breaker.allow());
    }

    #[test]
    fn test_abandoned_trial_admits_next_caller() {
        let (breaker, clock) = breaker(1, Duration::from_secs(1));
        breaker.record_failure();
        clock.advance(Duration::from_secs(2));

        assert!(breaker.allow());
        breaker.record_abandoned();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.allow());
        assert!(!breaker.allow());

        breaker.record_failure();
        assert!(matches!(breaker.state(), CircuitState::Open { .. }));
        assert!(!breaker.trial_in_flight());
    }

    #[test]
    fn test_admit_marks_only_the_trial() {
        let (breaker, clock) = breaker(1, Duration::from_secs(1));
        assert_eq!(breaker.admit(), Ok(false));
        breaker.record_failure();
        clock.advance(Duration::from_secs(2));
        assert_eq!(breaker.admit(), Ok(true));
        assert!(breaker.admit().is_err());
    }

    #[test]
    fn test_abandon_while_closed_is_noop() {
        let (breaker, _clock) = breaker(2, Duration::from_secs(1));
        breaker.record_failure();
        breaker.record_abandoned();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 1);
    }
}
