//! Shared types for chat-relay: conversation turns, failure taxonomy, and the clock seam.

pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FailureKind, GatewayError};
pub use types::{ChatMessage, ChatRole, FailureCategory, Role, Turn};
