use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "chat-relay: rate-limited, circuit-protected chat completion gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.config/chat-relay/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output format (text or json)
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat through the gateway, one message per stdin line
    Chat {
        /// Identity the messages are sent as
        #[arg(short, long, default_value = "local")]
        identity: String,

        /// Answer with an offline echo client instead of the provider
        #[arg(long)]
        offline: bool,
    },

    /// Show/manage configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Write a commented config template
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
}

/// Output format for CLI responses
#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
