//! Interactive stdin driver standing in for a chat transport.
//!
//! Each line is one inbound message from the current identity. Lines starting
//! with `/` are local commands (`/clear`, `/status`, `/as <identity>`, `/quit`).

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::cli::OutputFormat;
use relay_config::RelayConfig;
use relay_core::{GatewayError, SystemClock};
use relay_gateway::{
    ApiClient, CompletionClient, CompletionGateway, EchoClient, GatewayContext, GatewaySettings,
    GatewayStatus,
};

const USAGE: &str = "Please provide a message! Commands: /clear, /status, /as <identity>, /quit";
const RETRY_HINT: &str = "You can try again now.";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ChatInput {
    Message(String),
    Clear,
    Status,
    SwitchIdentity(String),
    Quit,
    Usage,
}

pub(crate) fn parse_line(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Usage;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Message(line.to_string());
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    match (parts.next(), parts.next().map(str::trim)) {
        (Some("clear"), None) => ChatInput::Clear,
        (Some("status"), None) => ChatInput::Status,
        (Some("quit" | "exit"), None) => ChatInput::Quit,
        (Some("as"), Some(identity)) if !identity.is_empty() => {
            ChatInput::SwitchIdentity(identity.to_string())
        }
        _ => ChatInput::Usage,
    }
}

pub(crate) fn build_gateway(config: &RelayConfig, offline: bool) -> Result<CompletionGateway> {
    let client: Arc<dyn CompletionClient> = if offline {
        Arc::new(EchoClient)
    } else {
        Arc::new(ApiClient::from_config(&config.provider)?)
    };
    let context = GatewayContext::from_config(config, Arc::new(SystemClock));
    let settings = GatewaySettings::from_config(config)?;
    Ok(CompletionGateway::new(context, client, settings))
}

pub(crate) async fn handle_chat(
    config: RelayConfig,
    identity: String,
    offline: bool,
    format: OutputFormat,
) -> Result<()> {
    let gateway = build_gateway(&config, offline)?;
    let mut identity = identity;
    info!(identity = %identity, offline, "Chat session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ChatInput::Message(message) => {
                let outcome = gateway.respond(&identity, &message).await;
                println!("{}", format_outcome(&format, &identity, &outcome)?);
            }
            ChatInput::Clear => println!("{}", gateway.clear_conversation(&identity)),
            ChatInput::Status => println!("{}", format_status(&format, &gateway.status())?),
            ChatInput::SwitchIdentity(next) => {
                identity = next;
                eprintln!("Now chatting as '{identity}'");
            }
            ChatInput::Quit => break,
            ChatInput::Usage => eprintln!("{USAGE}"),
        }
    }
    Ok(())
}

/// Render one `respond` outcome. Failures that are worth retrying right away
/// (not gated by the circuit or the rate window) say so.
pub(crate) fn format_outcome(
    format: &OutputFormat,
    identity: &str,
    outcome: &std::result::Result<String, GatewayError>,
) -> Result<String> {
    let rendered = match (format, outcome) {
        (OutputFormat::Json, Ok(reply)) => {
            serde_json::to_string(&serde_json::json!({ "identity": identity, "reply": reply }))?
        }
        (OutputFormat::Json, Err(err)) => serde_json::to_string(&serde_json::json!({
            "identity": identity,
            "error": err.kind().as_str(),
            "reply": err.user_message(),
            "retry_now": err.is_retryable_now(),
        }))?,
        (OutputFormat::Text, Ok(reply)) => reply.clone(),
        (OutputFormat::Text, Err(err)) if err.is_retryable_now() => {
            format!("[{}] {} {RETRY_HINT}", err.kind(), err.user_message())
        }
        (OutputFormat::Text, Err(err)) => format!("[{}] {}", err.kind(), err.user_message()),
    };
    Ok(rendered)
}

pub(crate) fn format_status(format: &OutputFormat, status: &GatewayStatus) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(status)?,
        OutputFormat::Text => format!(
            "circuit: {}, sessions: {}, rate windows: {}",
            status.circuit, status.tracked_sessions, status.tracked_windows
        ),
    })
}
