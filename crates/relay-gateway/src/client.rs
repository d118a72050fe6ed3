use anyhow::Result;
use async_trait::async_trait;
use relay_config::GenerationConfig;
use relay_core::ChatMessage;
use serde::Serialize;

/// Fixed generation parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub presence_penalty: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 150,
            temperature: 0.7,
            presence_penalty: 0.6,
        }
    }
}

impl From<&GenerationConfig> for CompletionOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            presence_penalty: config.presence_penalty,
        }
    }
}

/// The external text-completion service.
///
/// Failures are opaque: the gateway only looks at the error's description.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce a reply for `prompt` (system instruction first, then turns oldest first).
    async fn complete(&self, prompt: &[ChatMessage], options: &CompletionOptions)
    -> Result<String>;
}
