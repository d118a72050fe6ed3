use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use relay_config::ProviderConfig;
use relay_core::ChatMessage;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::{CompletionClient, CompletionOptions};

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug)]
pub struct ApiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            bail!("a model name is required for ApiClient");
        }

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model,
            client: reqwest::Client::new(),
        })
    }

    /// Build from provider config, reading the API key from the environment.
    pub fn from_config(provider: &ProviderConfig) -> Result<Self> {
        let api_key = provider.api_key()?;
        Self::new(&provider.base_url, api_key, &provider.model)
    }

    fn request_body(&self, prompt: &[ChatMessage], options: &CompletionOptions) -> Value {
        json!({
            "model": self.model,
            "messages": prompt,
            "max_tokens": options.max_output_tokens,
            "temperature": options.temperature,
            "presence_penalty": options.presence_penalty,
        })
    }
}

#[async_trait]
impl CompletionClient for ApiClient {
    async fn complete(
        &self,
        prompt: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, options))
            .send()
            .await
            .with_context(|| format!("completion request failed for model {}", self.model))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body for model {}", self.model))?;

        if status.is_success() {
            return parse_completion_content(&body);
        }

        Err(anyhow!(describe_http_failure(status, &body)))
    }
}

/// Describe a non-success response.
///
/// A bare 429 is labelled `rate_limit` so the gateway's classifier sees it
/// even when the provider sends no body.
fn describe_http_failure(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return format!("rate_limit: provider throttled the request (status {status}) {body}")
            .trim_end()
            .to_string();
    }
    format!("completion request failed: status {status}, body {body}")
}

fn parse_completion_content(body: &str) -> Result<String> {
    let value: Value =
        serde_json::from_str(body).context("failed to parse completion response JSON")?;
    let content = value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing choices[0].message.content in completion response"))?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::Turn;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = ApiClient::new("https://api.example.com/v1/", "sk", "gpt").unwrap();
        assert_eq!(client.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn test_new_rejects_empty_model() {
        assert!(ApiClient::new("https://api.example.com", "sk", " ").is_err());
    }

    #[test]
    fn test_from_config_without_key_fails() {
        let provider = ProviderConfig {
            api_key_env: "RELAY_GATEWAY_TEST_UNSET_KEY".to_string(),
            ..Default::default()
        };
        let err = ApiClient::from_config(&provider).unwrap_err();
        assert!(err.to_string().contains("RELAY_GATEWAY_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_request_body_shape() {
        let client = ApiClient::new("https://api.example.com", "sk", "gpt-4").unwrap();
        let prompt = vec![ChatMessage::system("sys"), ChatMessage::from(&Turn::user("hi"))];
        let body = client.request_body(&prompt, &CompletionOptions::default());

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((body["presence_penalty"].as_f64().unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_parse_completion_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"}}]}"#;
        assert_eq!(parse_completion_content(body).unwrap(), "Hello!");
    }

    #[test]
    fn test_parse_completion_content_missing_choices() {
        let err = parse_completion_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(err.to_string().contains("choices[0].message.content"));
        assert!(parse_completion_content("not json").is_err());
    }

    #[test]
    fn test_describe_429_is_rate_limit_class() {
        let description = describe_http_failure(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(description.starts_with("rate_limit:"));
        assert!(description.contains("429"));
    }

    #[test]
    fn test_describe_quota_body_keeps_provider_text() {
        let body = r#"{"error":{"code":"insufficient_quota","message":"You exceeded your current quota"}}"#;
        let description = describe_http_failure(StatusCode::FORBIDDEN, body);
        assert!(description.contains("insufficient_quota"));
        assert!(description.contains("403"));
    }
}
