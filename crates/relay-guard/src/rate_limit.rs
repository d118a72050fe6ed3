//! Per-identity fixed-window admission control.
//!
//! Each identity gets a counter and a window end. A call after the window end
//! starts a new window; within a window at most `capacity` calls are admitted.
//! Bursts straddling a window boundary are admitted (up to `2 * capacity`
//! in quick succession); the limiter trades smoothness for O(1) state.

use relay_core::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_end: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Admit or deny one message from `identity`.
    ///
    /// Reset, check and increment happen under one lock, so concurrent callers
    /// for the same identity can never push the count past capacity.
    pub fn allow(&self, identity: &str) -> bool {
        let now = self.clock.now();
        // Every critical section leaves the map consistent; a poisoned lock is safe to reuse.
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = windows
            .entry(identity.to_string())
            .or_insert_with(|| RateWindow {
                count: 0,
                window_end: window_end_from(now, self.policy.window),
            });

        if now > window.window_end {
            window.count = 0;
            window.window_end = window_end_from(now, self.policy.window);
        }

        if window.count >= self.policy.capacity {
            debug!(identity = %identity, count = window.count, "Rate window full");
            return false;
        }

        window.count += 1;
        true
    }

    /// Number of identities with a rate window. Windows are never evicted.
    pub fn tracked_identities(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// `now + window`, clamped to the latest representable instant instead of panicking.
fn window_end_from(now: Instant, window: Duration) -> Instant {
    let mut window = window;
    loop {
        if let Some(end) = now.checked_add(window) {
            return end;
        }
        window /= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::ManualClock;

    fn limiter(capacity: u32, window_secs: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let policy = RateLimitPolicy {
            window: Duration::from_secs(window_secs),
            capacity,
        };
        (RateLimiter::new(policy, clock.clone()), clock)
    }

    #[test]
    fn test_first_capacity_calls_admitted_then_denied() {
        let (limiter, _clock) = limiter(5, 60);
        let results: Vec<bool> = (0..6).map(|_| limiter.allow("u1")).collect();
        assert_eq!(results, vec![true, true, true, true, true, false]);
        assert!(!limiter.allow("u1"), "Still denied within the window");
    }

    #[test]
    fn test_window_rollover_resets_count() {
        let (limiter, clock) = limiter(2, 60);
        assert!(limiter.allow("u1"));
        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));

        clock.advance(Duration::from_secs(61));
        assert!(limiter.allow("u1"));
        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));
    }

    #[test]
    fn test_window_end_is_inclusive() {
        let (limiter, clock) = limiter(1, 60);
        assert!(limiter.allow("u1"));

        // Exactly at window end is still the old window.
        clock.advance(Duration::from_secs(60));
        assert!(!limiter.allow("u1"));

        clock.advance(Duration::from_millis(1));
        assert!(limiter.allow("u1"));
    }

    #[test]
    fn test_denied_calls_do_not_extend_window() {
        let (limiter, clock) = limiter(1, 60);
        assert!(limiter.allow("u1"));
        clock.advance(Duration::from_secs(30));
        assert!(!limiter.allow("u1"));
        clock.advance(Duration::from_secs(31));
        assert!(limiter.allow("u1"));
    }

    #[test]
    fn test_identities_are_independent() {
        let (limiter, _clock) = limiter(1, 60);
        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));
        assert!(limiter.allow("u2"));
        assert_eq!(limiter.tracked_identities(), 2);
    }

    #[test]
    fn test_boundary_burst_is_admitted() {
        let (limiter, clock) = limiter(3, 60);
        assert!(limiter.allow("u1"));
        clock.advance(Duration::from_secs(59));
        let late: Vec<bool> = (0..2).map(|_| limiter.allow("u1")).collect();
        clock.advance(Duration::from_secs(2));
        let early: Vec<bool> = (0..3).map(|_| limiter.allow("u1")).collect();
        // Five admissions within two seconds across the boundary.
        assert_eq!(late, vec![true, true]);
        assert_eq!(early, vec![true, true, true]);
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let clock = Arc::new(ManualClock::new());
        let policy = RateLimitPolicy {
            window: Duration::MAX,
            capacity: 1,
        };
        let limiter = RateLimiter::new(policy, clock.clone());

        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));
        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert!(!limiter.allow("u1"), "window end is clamped far in the future");
    }

    #[test]
    fn test_window_end_from_clamps() {
        let now = Instant::now();
        let minute = Duration::from_secs(60);
        assert_eq!(window_end_from(now, minute), now + minute);
        assert!(window_end_from(now, Duration::MAX) > now);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_never_exceed_capacity() {
        let (limiter, _clock) = limiter(5, 60);
        let limiter = Arc::new(limiter);

        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.allow("shared") }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.expect("task should not panic") {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }
}
