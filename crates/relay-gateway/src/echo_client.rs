use anyhow::Result;
use async_trait::async_trait;
use relay_core::{ChatMessage, ChatRole};

use crate::{CompletionClient, CompletionOptions};

/// Offline client that answers with the latest user message.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoClient;

#[async_trait]
impl CompletionClient for EchoClient {
    async fn complete(
        &self,
        prompt: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String> {
        Ok(prompt
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::User)
            .map(|message| format!("You said: {}", message.content))
            .unwrap_or_default())
    }
}
