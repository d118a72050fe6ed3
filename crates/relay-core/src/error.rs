use serde::Serialize;

/// Which gate rejected a `respond` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// Circuit is open; the downstream service was not called.
    ServiceUnavailable,
    /// Per-identity admission denied for the current window.
    RateLimited,
    /// This call's downstream failure was quota/rate class and opened the circuit.
    CircuitTripped,
    /// Any other downstream failure.
    DownstreamError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "service_unavailable",
            Self::RateLimited => "rate_limited",
            Self::CircuitTripped => "circuit_tripped",
            Self::DownstreamError => "downstream_error",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classified failure returned by the gateway.
///
/// `Display` renders the text meant for the end user. Only
/// `DownstreamError` carries any detail from the underlying failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{message}")]
    ServiceUnavailable { message: String },

    #[error("{message}")]
    RateLimited { message: String },

    #[error("{message}")]
    CircuitTripped { message: String },

    #[error("{message} ({detail})")]
    DownstreamError { message: String, detail: String },
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ServiceUnavailable { .. } => FailureKind::ServiceUnavailable,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::CircuitTripped { .. } => FailureKind::CircuitTripped,
            Self::DownstreamError { .. } => FailureKind::DownstreamError,
        }
    }

    /// Text to relay back to the chat user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether the caller may retry right away with a fresh message.
    pub fn is_retryable_now(&self) -> bool {
        matches!(self, Self::DownstreamError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_service_unavailable() {
        let err = GatewayError::ServiceUnavailable {
            message: "Taking a short break.".into(),
        };
        assert_eq!(err.to_string(), "Taking a short break.");
        assert_eq!(err.kind(), FailureKind::ServiceUnavailable);
    }

    #[test]
    fn test_display_downstream_error_appends_detail() {
        let err = GatewayError::DownstreamError {
            message: "Something went wrong.".into(),
            detail: "connection reset".into(),
        };
        assert_eq!(err.user_message(), "Something went wrong. (connection reset)");
        assert_eq!(err.kind(), FailureKind::DownstreamError);
        assert!(err.is_retryable_now());
    }

    #[test]
    fn test_circuit_tripped_hides_detail() {
        let err = GatewayError::CircuitTripped {
            message: "Busy right now.".into(),
        };
        assert_eq!(err.to_string(), "Busy right now.");
        assert!(!err.is_retryable_now());
    }

    #[test]
    fn test_failure_kind_as_str() {
        assert_eq!(FailureKind::RateLimited.as_str(), "rate_limited");
        assert_eq!(FailureKind::CircuitTripped.to_string(), "circuit_tripped");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GatewayError>();
    }
}
