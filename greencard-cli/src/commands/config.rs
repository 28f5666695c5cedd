use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use eyre::{Context as _, Result};
use greencard_core::config::{app_status, ConfigResult};

use super::cached_config;
use crate::DataDir;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the cached config as JSON.
    Show,
    /// Validate and persist a downloaded config bundle.
    Import {
        /// Path to `config.json`
        #[arg(long)]
        config: PathBuf,
        /// Path to `public_keys.json`
        #[arg(long)]
        public_keys: PathBuf,
    },
    /// Print the app status an offline start would show.
    Status {
        /// Version code of the app.
        #[arg(long, env = "GREENCARD_VERSION_CODE")]
        version_code: u32,
    },
    /// Print the display name of a provider.
    Provider {
        /// Provider identifier, e.g. GGD
        identifier: String,
    },
}

pub fn run(command: ConfigCommand, data_dir: &DataDir) -> Result<()> {
    let config = cached_config(data_dir);

    match command {
        ConfigCommand::Show => {
            if config.cached().is_none() {
                tracing::warn!("no config cached, showing the empty default");
            }
            println!("{}", serde_json::to_string_pretty(config.get().as_ref())?);
        }
        ConfigCommand::Import {
            config: config_path,
            public_keys,
        } => {
            let config_bytes = std::fs::read(&config_path)
                .wrap_err_with(|| format!("reading {}", config_path.display()))?;
            let key_bytes = std::fs::read(&public_keys)
                .wrap_err_with(|| format!("reading {}", public_keys.display()))?;
            let persisted = config.persist(&config_bytes, &key_bytes, Utc::now())?;
            println!(
                "imported config (minimum version {}, {} provider(s))",
                persisted.minimum_version,
                persisted.provider_identifiers.len()
            );
        }
        ConfigCommand::Status { version_code } => {
            let status = app_status(&ConfigResult::Error, &config, version_code, Utc::now());
            println!("{status:?}");
        }
        ConfigCommand::Provider { identifier } => {
            let name = config.provider_name(&identifier);
            if name.is_empty() {
                eyre::bail!("unknown provider {identifier}");
            }
            println!("{name}");
        }
    }
    Ok(())
}
