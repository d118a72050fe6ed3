//! Gateway configuration for chat-relay (`~/.config/chat-relay/config.toml`).
//!
//! Every knob has a default, so a missing file (or a missing section) yields
//! the stock gateway: history cap 4, five messages per 60s window, five-minute
//! circuit reset, 150 output tokens at temperature 0.7.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HISTORY_CAP: usize = 4;
const DEFAULT_RATE_WINDOW_SECS: u64 = 60;
const DEFAULT_RATE_CAPACITY: u32 = 5;
const DEFAULT_CIRCUIT_RESET_SECS: u64 = 300;
/// Upper bound for `rate_window_secs` and `circuit_reset_secs` (one day).
pub const MAX_LIMIT_SECS: u64 = 86_400;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 150;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_PRESENCE_PENALTY: f32 = 0.6;
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful and friendly chat assistant. \
    Provide clear, concise, and engaging responses.";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum turns kept per identity (default: 4).
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Fixed rate window length in seconds (default: 60).
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
    /// Messages admitted per identity per window (default: 5).
    #[serde(default = "default_rate_capacity")]
    pub rate_capacity: u32,
    /// Seconds the circuit stays open after a quota failure (default: 300).
    #[serde(default = "default_circuit_reset_secs")]
    pub circuit_reset_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_window_secs: DEFAULT_RATE_WINDOW_SECS,
            rate_capacity: DEFAULT_RATE_CAPACITY,
            circuit_reset_secs: DEFAULT_CIRCUIT_RESET_SECS,
        }
    }
}

impl LimitsConfig {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn circuit_reset(&self) -> Duration {
        Duration::from_secs(self.circuit_reset_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f32,
    /// Instruction prepended to every prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// User-safe replies substituted for failure detail.
    #[serde(default = "default_fallback_messages")]
    pub fallback_messages: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            presence_penalty: DEFAULT_PRESENCE_PENALTY,
            system_prompt: default_system_prompt(),
            fallback_messages: default_fallback_messages(),
        }
    }
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl ProviderConfig {
    /// Read the API key from the process environment.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    /// Resolve the API key through `lookup` (the environment, in production).
    pub fn api_key_from<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(&self.api_key_env) {
            Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => bail!(
                "API key not found: set the {} environment variable",
                self.api_key_env
            ),
        }
    }
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_rate_window_secs() -> u64 {
    DEFAULT_RATE_WINDOW_SECS
}

fn default_rate_capacity() -> u32 {
    DEFAULT_RATE_CAPACITY
}

fn default_circuit_reset_secs() -> u64 {
    DEFAULT_CIRCUIT_RESET_SECS
}

fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_presence_penalty() -> f32 {
    DEFAULT_PRESENCE_PENALTY
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

/// Stock fallback replies shown when the completion service misbehaves.
pub fn default_fallback_messages() -> Vec<String> {
    [
        "I'm a bit overwhelmed right now. Please try again in a few minutes.",
        "My thinking engine needs a short break. Let's pick this up again soon.",
        "I can't reach my brain at the moment. Please try again later.",
        "Too many people are talking to me right now. Give me a moment and ask again.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl RelayConfig {
    /// Load from the default location.
    ///
    /// Returns `Default` if the file does not exist or if the config
    /// directory cannot be determined (e.g., no HOME in containers).
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(Self::default()),
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate a specific config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Reject values the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.session.history_cap == 0 {
            bail!("session.history_cap must be at least 1");
        }
        if self.limits.rate_capacity == 0 {
            bail!("limits.rate_capacity must be at least 1");
        }
        if self.limits.rate_window_secs == 0 {
            bail!("limits.rate_window_secs must be at least 1");
        }
        if self.limits.rate_window_secs > MAX_LIMIT_SECS {
            bail!(
                "limits.rate_window_secs must be at most {MAX_LIMIT_SECS} (got {})",
                self.limits.rate_window_secs
            );
        }
        if self.limits.circuit_reset_secs > MAX_LIMIT_SECS {
            bail!(
                "limits.circuit_reset_secs must be at most {MAX_LIMIT_SECS} (got {})",
                self.limits.circuit_reset_secs
            );
        }
        if self.generation.max_output_tokens == 0 {
            bail!("generation.max_output_tokens must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            bail!(
                "generation.temperature must be within 0.0..=2.0 (got {})",
                self.generation.temperature
            );
        }
        if !(-2.0..=2.0).contains(&self.generation.presence_penalty) {
            bail!(
                "generation.presence_penalty must be within -2.0..=2.0 (got {})",
                self.generation.presence_penalty
            );
        }
        if self
            .generation
            .fallback_messages
            .iter()
            .all(|m| m.trim().is_empty())
        {
            bail!("generation.fallback_messages must contain at least one non-empty message");
        }
        if self.provider.base_url.trim().is_empty() {
            bail!("provider.base_url must not be empty");
        }
        Ok(())
    }

    /// Path to the config file: `~/.config/chat-relay/config.toml`.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "chat-relay")
            .context("Failed to determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Default config TOML with comments, as a starting template.
    pub fn default_template() -> String {
        r#"# chat-relay configuration
# Location: ~/.config/chat-relay/config.toml

[session]
history_cap = 4           # Turns remembered per chat user

[limits]
rate_window_secs = 60     # Fixed admission window
rate_capacity = 5         # Messages per user per window
circuit_reset_secs = 300  # Pause after the provider reports quota exhaustion

[generation]
max_output_tokens = 150
temperature = 0.7
presence_penalty = 0.6
# system_prompt = "You are a helpful and friendly chat assistant."
# fallback_messages = ["Please try again in a few minutes."]

[provider]
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"
"#
        .to_string()
    }

    /// Write the default template to `path`, creating directories as needed.
    pub fn save_default_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(path, Self::default_template())
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
