use relay_config::RelayConfig;
use relay_core::Clock;
use relay_guard::{CircuitBreaker, RateLimitPolicy, RateLimiter};
use relay_session::SessionStore;
use std::sync::Arc;

/// The three stateful components a gateway drives.
///
/// Built once per gateway (or per test) instead of living in process-wide
/// statics; clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub limiter: Arc<RateLimiter>,
    pub breaker: Arc<CircuitBreaker>,
    pub sessions: Arc<SessionStore>,
}

impl GatewayContext {
    pub fn new(
        limiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            limiter,
            breaker,
            sessions,
        }
    }

    pub fn from_config(config: &RelayConfig, clock: Arc<dyn Clock>) -> Self {
        let policy = RateLimitPolicy {
            window: config.limits.rate_window(),
            capacity: config.limits.rate_capacity,
        };
        Self::new(
            Arc::new(RateLimiter::new(policy, clock.clone())),
            Arc::new(CircuitBreaker::new(config.limits.circuit_reset(), clock)),
            Arc::new(SessionStore::new(config.session.history_cap)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::ManualClock;
    use std::time::Duration;

    #[test]
    fn test_from_config_applies_limits() {
        let mut config = RelayConfig::default();
        config.limits.rate_capacity = 2;
        config.limits.circuit_reset_secs = 10;
        config.session.history_cap = 6;

        let context = GatewayContext::from_config(&config, Arc::new(ManualClock::new()));
        assert_eq!(context.limiter.policy().capacity, 2);
        assert_eq!(context.limiter.policy().window, Duration::from_secs(60));
        assert_eq!(context.breaker.reset_timeout(), Duration::from_secs(10));
        assert_eq!(context.sessions.history_cap(), 6);
    }

    #[test]
    fn test_clones_share_state() {
        let context =
            GatewayContext::from_config(&RelayConfig::default(), Arc::new(ManualClock::new()));
        let other = context.clone();
        other.sessions.append("u1", relay_core::Turn::user("hi"));
        assert_eq!(context.sessions.history("u1").len(), 1);
    }
}
