use anyhow::Result;
use relay_config::RelayConfig;
use relay_core::{ChatMessage, FailureCategory, GatewayError, Turn};
use relay_guard::{CircuitStatus, classify_failure};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::fallback::{FallbackMessages, FallbackSelector, RandomSelector};
use crate::{CompletionClient, CompletionOptions, GatewayContext};

const MAX_DETAIL_CHARS: usize = 160;

/// Per-gateway constants: the system instruction, generation options and fallbacks.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub system_prompt: String,
    pub options: CompletionOptions,
    pub fallbacks: FallbackMessages,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        let generation = relay_config::GenerationConfig::default();
        Self {
            system_prompt: generation.system_prompt.clone(),
            options: CompletionOptions::from(&generation),
            fallbacks: FallbackMessages::default(),
        }
    }
}

impl GatewaySettings {
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Ok(Self {
            system_prompt: config.generation.system_prompt.clone(),
            options: CompletionOptions::from(&config.generation),
            fallbacks: FallbackMessages::new(config.generation.fallback_messages.clone())?,
        })
    }
}

/// Point-in-time view of gateway state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayStatus {
    pub circuit: CircuitStatus,
    pub tracked_sessions: usize,
    pub tracked_windows: usize,
}

/// Mediates every chat identity's access to the completion service.
pub struct CompletionGateway {
    context: GatewayContext,
    client: Arc<dyn CompletionClient>,
    settings: GatewaySettings,
    selector: Box<dyn FallbackSelector>,
}

impl std::fmt::Debug for CompletionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGateway")
            .field("context", &self.context)
            .field("settings", &self.settings)
            .finish()
    }
}

impl CompletionGateway {
    pub fn new(
        context: GatewayContext,
        client: Arc<dyn CompletionClient>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            context,
            client,
            settings,
            selector: Box::new(RandomSelector),
        }
    }

    /// Replace the fallback selection strategy.
    pub fn with_selector(mut self, selector: Box<dyn FallbackSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn context(&self) -> &GatewayContext {
        &self.context
    }

    /// Produce a reply to `message` from `identity`.
    ///
    /// Gates run in order: circuit, admission, then the downstream call. The
    /// user turn is recorded before the call and stays in history even if the
    /// call fails. No lock is held while the call is in flight.
    pub async fn respond(&self, identity: &str, message: &str) -> Result<String, GatewayError> {
        if self.context.breaker.is_open() {
            warn!(identity = %identity, "Circuit open, skipping completion call");
            return Err(GatewayError::ServiceUnavailable {
                message: self.fallback_message(),
            });
        }

        if !self.context.limiter.allow(identity) {
            warn!(identity = %identity, "Rate limit exceeded");
            return Err(GatewayError::RateLimited {
                message: self.rate_limited_message(),
            });
        }

        let history = self
            .context
            .sessions
            .append_and_snapshot(identity, Turn::user(message));
        let prompt = build_prompt(&self.settings.system_prompt, &history);
        debug!(identity = %identity, turns = history.len(), "Calling completion service");

        match self.client.complete(&prompt, &self.settings.options).await {
            Ok(reply) => {
                self.context
                    .sessions
                    .append(identity, Turn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(err) => Err(self.map_failure(identity, &err)),
        }
    }

    /// Forget `identity`'s history. Not subject to the circuit or rate limit.
    pub fn clear_conversation(&self, identity: &str) -> String {
        self.context.sessions.clear(identity)
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            circuit: self.context.breaker.state(),
            tracked_sessions: self.context.sessions.tracked_identities(),
            tracked_windows: self.context.limiter.tracked_identities(),
        }
    }

    fn map_failure(&self, identity: &str, err: &anyhow::Error) -> GatewayError {
        // Classify on the whole chain; markers often sit in a cause.
        let chain = format!("{err:#}");
        let category = classify_failure(&chain);
        if category == FailureCategory::QuotaExhausted {
            self.context.breaker.record_failure(category);
            warn!(identity = %identity, error = %chain, "Quota failure, circuit tripped");
            return GatewayError::CircuitTripped {
                message: self.fallback_message(),
            };
        }

        warn!(identity = %identity, error = %chain, "Completion call failed");
        GatewayError::DownstreamError {
            message: self.fallback_message(),
            detail: short_description(err),
        }
    }

    fn fallback_message(&self) -> String {
        self.settings.fallbacks.pick(self.selector.as_ref()).to_string()
    }

    fn rate_limited_message(&self) -> String {
        let policy = self.context.limiter.policy();
        format!(
            "You're sending messages too quickly. You can send {} messages every {} seconds, please wait a moment.",
            policy.capacity,
            policy.window.as_secs()
        )
    }
}

/// System instruction followed by the history, oldest first.
pub fn build_prompt(system_prompt: &str, history: &[Turn]) -> Vec<ChatMessage> {
    std::iter::once(ChatMessage::system(system_prompt))
        .chain(history.iter().map(ChatMessage::from))
        .collect()
}

/// Top-level error message, cut to a length fit for a chat reply.
fn short_description(err: &anyhow::Error) -> String {
    let full = err.to_string();
    if full.chars().count() <= MAX_DETAIL_CHARS {
        return full;
    }
    let mut short: String = full.chars().take(MAX_DETAIL_CHARS).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
