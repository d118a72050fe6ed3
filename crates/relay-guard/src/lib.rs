//! Admission control and failure isolation: per-identity rate limiting,
//! the global circuit breaker, and quota/rate-limit failure classification.

pub mod circuit;
pub mod classify;
pub mod rate_limit;

pub use circuit::{CircuitBreaker, CircuitStatus};
pub use classify::{QuotaDetected, classify_failure, detect_quota_failure};
pub use rate_limit::{RateLimitPolicy, RateLimiter};
