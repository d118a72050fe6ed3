//! Quota / rate-limit detection from downstream failure descriptions.
//!
//! Best-effort heuristic: the completion service gives us no structured error
//! taxonomy, only a human-readable description. Only the `quota` and
//! `rate_limit` markers are recognised; any other provider vocabulary
//! ("429", "overloaded", ...) is classified as [`FailureCategory::Other`].

use relay_core::FailureCategory;
use serde::Serialize;

const QUOTA_PATTERNS: &[&str] = &["quota", "rate_limit"];

/// Information about a detected quota/rate-limit failure.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaDetected {
    pub matched_pattern: String,
}

/// Check a failure description for quota or rate-limit markers.
///
/// Matching is ASCII case-insensitive; the first pattern found wins.
pub fn detect_quota_failure(description: &str) -> Option<QuotaDetected> {
    let lower = description.to_ascii_lowercase();
    QUOTA_PATTERNS
        .iter()
        .find(|pattern| lower.contains(*pattern))
        .map(|pattern| QuotaDetected {
            matched_pattern: pattern.to_string(),
        })
}

/// Map an opaque failure description onto the closed category set.
pub fn classify_failure(description: &str) -> FailureCategory {
    if detect_quota_failure(description).is_some() {
        FailureCategory::QuotaExhausted
    } else {
        FailureCategory::Other
    }
}
