//! Circuit breaker over the job store boundary.
//!
//! Three-state automaton (closed / open / half-open) with a failure
//! counter and a single-timestamp recovery check. Pure state machine: it
//! never runs the guarded operation itself, callers ask permission and
//! report the outcome.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation
    Closed,
    /// Failing fast, waiting out the recovery timeout
    Open,
    /// One probe call allowed to test recovery
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker with a failure threshold and recovery timeout
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker in the closed state.
    #[must_use]
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    /// Ask permission to run a guarded call, evaluated at `now`.
    ///
    /// Returns `false` while open and inside the recovery window. When the
    /// window has elapsed the breaker moves to half-open and admits one
    /// probe.
    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return true;
        };
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let recovered = inner
                    .last_failure
                    .is_some_and(|at| now.duration_since(at) >= self.recovery_timeout);
                if recovered {
                    inner.state = CircuitState::HalfOpen;
                    tracing::info!("circuit breaker transitioning to half-open");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Ask permission, evaluated at the current instant.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Report a successful guarded call.
    pub fn on_success(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failure_count = 0;
            if inner.state != CircuitState::Closed {
                tracing::info!("circuit breaker reset to closed");
            }
            inner.state = CircuitState::Closed;
        }
    }

    /// Report a failed guarded call observed at `now`.
    pub fn on_failure_at(&self, now: Instant) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failure_count += 1;
            inner.last_failure = Some(now);
            if inner.state == CircuitState::HalfOpen || inner.failure_count >= self.failure_threshold
            {
                if inner.state != CircuitState::Open {
                    tracing::error!(
                        failures = inner.failure_count,
                        "circuit breaker opened"
                    );
                }
                inner.state = CircuitState::Open;
            }
        }
    }

    /// Report a failed guarded call at the current instant.
    pub fn on_failure(&self) {
        self.on_failure_at(Instant::now());
    }

    /// Current state (for health reporting and tests).
    pub fn state(&self) -> CircuitState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(CircuitState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, Duration::from_secs(30))
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = breaker();
        let now = Instant::now();
        for _ in 0..2 {
            breaker.on_failure_at(now);
            assert_eq!(breaker.state(), CircuitState::Closed);
        }
        breaker.on_failure_at(now);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.try_acquire_at(now + Duration::from_secs(1)));
    }

    #[test]
    fn recovers_through_half_open_probe() {
        let breaker = breaker();
        let now = Instant::now();
        for _ in 0..3 {
            breaker.on_failure_at(now);
        }

        // Inside the window: still failing fast.
        assert!(!breaker.try_acquire_at(now + Duration::from_secs(29)));

        // Window elapsed: one probe allowed.
        assert!(breaker.try_acquire_at(now + Duration::from_secs(30)));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.on_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire_at(now + Duration::from_secs(31)));
    }

    #[test]
    fn failed_probe_reopens_immediately() {
        let breaker = breaker();
        let now = Instant::now();
        for _ in 0..3 {
            breaker.on_failure_at(now);
        }
        assert!(breaker.try_acquire_at(now + Duration::from_secs(30)));
        breaker.on_failure_at(now + Duration::from_secs(30));
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn success_resets_the_failure_count() {
        let breaker = breaker();
        let now = Instant::now();
        breaker.on_failure_at(now);
        breaker.on_failure_at(now);
        breaker.on_success();
        breaker.on_failure_at(now);
        breaker.on_failure_at(now);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
