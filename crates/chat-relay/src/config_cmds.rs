use anyhow::{Result, bail};
use std::path::PathBuf;

use crate::cli::OutputFormat;
use relay_config::RelayConfig;

/// Resolve the config file: `--config` wins over the default location.
pub(crate) fn config_path(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(PathBuf::from(path)),
        None => RelayConfig::config_path(),
    }
}

/// Load the effective config. A missing default file means defaults; a
/// missing explicit file is an error.
pub(crate) fn load_config(explicit: Option<&str>) -> Result<RelayConfig> {
    match explicit {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            RelayConfig::load_from(&path)
        }
        None => RelayConfig::load(),
    }
}

pub(crate) fn handle_config_show(explicit: Option<&str>, format: OutputFormat) -> Result<()> {
    let config = load_config(explicit)?;
    match format {
        OutputFormat::Json => {
            let json_str = serde_json::to_string_pretty(&config)?;
            println!("{}", json_str);
        }
        OutputFormat::Text => {
            let toml_str = toml::to_string_pretty(&config)?;
            print!("{}", toml_str);
        }
    }
    Ok(())
}

pub(crate) fn handle_config_init(explicit: Option<&str>, force: bool) -> Result<()> {
    let path = config_path(explicit)?;
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    RelayConfig::save_default_template(&path)?;
    eprintln!("Wrote config template to: {}", path.display());
    Ok(())
}

pub(crate) fn handle_config_path(explicit: Option<&str>) -> Result<()> {
    println!("{}", config_path(explicit)?.display());
    Ok(())
}
