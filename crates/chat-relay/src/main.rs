use anyhow::Result;
use clap::Parser;

mod chat_cmd;
mod cli;
mod config_cmds;

use cli::{Cli, Commands, ConfigCommands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (output to stderr, initialize only once)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config_arg = cli.config.as_deref();

    match cli.command {
        Commands::Chat { identity, offline } => {
            let config = config_cmds::load_config(config_arg)?;
            chat_cmd::handle_chat(config, identity, offline, cli.format).await?;
        }
        Commands::Config { cmd } => match cmd {
            ConfigCommands::Show => config_cmds::handle_config_show(config_arg, cli.format)?,
            ConfigCommands::Init { force } => config_cmds::handle_config_init(config_arg, force)?,
            ConfigCommands::Path => config_cmds::handle_config_path(config_arg)?,
        },
    }
    Ok(())
}
