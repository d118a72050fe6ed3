//! Global circuit breaker guarding the completion service.
//!
//! Two states only. A quota-class failure opens the circuit; it closes again
//! purely on time, on the first check strictly after `reset_timeout` has
//! elapsed since the last quota failure. There is no half-open probe.

use relay_core::{Clock, FailureCategory};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitStatus {
    Closed,
    Open,
}

impl CircuitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
        }
    }
}

impl std::fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Default)]
struct CircuitState {
    open: bool,
    last_error_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    reset_timeout: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(reset_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            reset_timeout,
            clock,
            state: Mutex::new(CircuitState::default()),
        }
    }

    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    /// Whether downstream calls are currently blocked.
    ///
    /// Closes the circuit as a side effect once the reset timeout has passed.
    pub fn is_open(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.open {
            return false;
        }
        let expired = state
            .last_error_at
            .is_none_or(|at| now.duration_since(at) > self.reset_timeout);
        if expired {
            state.open = false;
            info!("Circuit closed after reset timeout");
            return false;
        }
        true
    }

    /// Record a downstream failure. Only quota-class failures open the circuit.
    pub fn record_failure(&self, category: FailureCategory) {
        if category != FailureCategory::QuotaExhausted {
            return;
        }
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.open {
            info!(
                reset_secs = self.reset_timeout.as_secs(),
                "Circuit opened after quota failure"
            );
        }
        state.open = true;
        state.last_error_at = Some(now);
    }

    /// Snapshot of the stored state without applying the time-based reset.
    pub fn state(&self) -> CircuitStatus {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.open {
            CircuitStatus::Open
        } else {
            CircuitStatus::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::ManualClock;

    fn breaker() -> (CircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (
            CircuitBreaker::new(Duration::from_secs(300), clock.clone()),
            clock,
        )
    }

    #[test]
    fn test_status_display_matches_serialized_form() {
        assert_eq!(CircuitStatus::Closed.to_string(), "closed");
        assert_eq!(CircuitStatus::Open.to_string(), "open");
        assert_eq!(
            serde_json::to_string(&CircuitStatus::Open).unwrap(),
            "\"open\""
        );
    }

    #[test]
    fn test_closed_initially() {
        let (breaker, _clock) = breaker();
        assert!(!breaker.is_open());
        assert_eq!(breaker.state(), CircuitStatus::Closed);
    }

    #[test]
    fn test_quota_failure_opens_immediately() {
        let (breaker, _clock) = breaker();
        breaker.record_failure(FailureCategory::QuotaExhausted);
        assert!(breaker.is_open());
        assert_eq!(breaker.state(), CircuitStatus::Open);
    }

    #[test]
    fn test_other_failure_never_opens() {
        let (breaker, _clock) = breaker();
        for _ in 0..10 {
            breaker.record_failure(FailureCategory::Other);
        }
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_stays_open_until_timeout_strictly_elapses() {
        let (breaker, clock) = breaker();
        breaker.record_failure(FailureCategory::QuotaExhausted);

        clock.advance(Duration::from_secs(299));
        assert!(breaker.is_open());

        clock.advance(Duration::from_secs(1));
        assert!(breaker.is_open(), "Exactly at the timeout is still open");

        clock.advance(Duration::from_millis(1));
        assert!(!breaker.is_open());
        assert_eq!(breaker.state(), CircuitStatus::Closed);
    }

    #[test]
    fn test_repeat_quota_failure_restarts_timeout() {
        let (breaker, clock) = breaker();
        breaker.record_failure(FailureCategory::QuotaExhausted);
        clock.advance(Duration::from_secs(200));
        breaker.record_failure(FailureCategory::QuotaExhausted);
        clock.advance(Duration::from_secs(200));
        assert!(breaker.is_open());
        clock.advance(Duration::from_secs(101));
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_state_does_not_apply_reset() {
        let (breaker, clock) = breaker();
        breaker.record_failure(FailureCategory::QuotaExhausted);
        clock.advance(Duration::from_secs(301));
        assert_eq!(breaker.state(), CircuitStatus::Open);
        assert!(!breaker.is_open());
        assert_eq!(breaker.state(), CircuitStatus::Closed);
    }
}
