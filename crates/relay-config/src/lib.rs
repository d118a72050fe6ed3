//! Gateway configuration loading and validation (`~/.config/chat-relay/config.toml`).

pub mod config;

pub use config::{
    GenerationConfig, LimitsConfig, ProviderConfig, RelayConfig, SessionConfig,
    default_fallback_messages,
};
