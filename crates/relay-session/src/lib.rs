//! In-memory, per-identity conversation history with a fixed turn cap.

mod store;

pub use store::{CLEARED_MESSAGE, SessionStore};
