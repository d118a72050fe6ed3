//! Completion gateway: sequences the circuit breaker, rate limiter and
//! session store around a call to the external completion service.

mod api_client;
mod client;
mod context;
mod echo_client;
pub mod fallback;
mod gateway;

pub use api_client::ApiClient;
pub use client::{CompletionClient, CompletionOptions};
pub use context::GatewayContext;
pub use echo_client::EchoClient;
pub use fallback::{FallbackMessages, FallbackSelector, FixedSelector, RandomSelector};
pub use gateway::{CompletionGateway, GatewaySettings, GatewayStatus, build_prompt};
