//! Developer CLI for GreenCard Kit.
//!
//! Works against a local data directory laid out like the app sandbox: `files/` and
//! `cache/` hold the config bundle, `blobs/` the stored event groups.

mod commands;
mod fs_store;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use commands::{ConfigCommand, EventsCommand};

#[derive(Parser, Debug)]
#[command(name = "greencard", version, about = "GreenCard Kit developer CLI")]
struct Cli {
    /// Data directory. Defaults to the platform's local data directory.
    #[arg(long, env = "GREENCARD_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect and import the cached app config.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Import and browse stored provider events.
    #[command(subcommand)]
    Events(EventsCommand),
}

/// Resolved locations inside the data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    fn resolve(data_dir: Option<PathBuf>) -> Result<Self> {
        let root = match data_dir {
            Some(root) => root,
            None => dirs::data_local_dir()
                .ok_or_else(|| eyre::eyre!("no local data directory, pass --data-dir"))?
                .join("greencard"),
        };
        std::fs::create_dir_all(&root)
            .wrap_err_with(|| format!("creating {}", root.display()))?;
        Ok(Self { root })
    }

    /// Directory holding downloaded files.
    #[must_use]
    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    /// Directory holding cached data.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Directory holding stored blobs.
    #[must_use]
    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let data_dir = DataDir::resolve(cli.data_dir)?;
    tracing::debug!(root = %data_dir.root.display(), "using data directory");

    match cli.command {
        Command::Config(command) => commands::config::run(command, &data_dir),
        Command::Events(command) => commands::events::run(command, &data_dir).await,
    }
}
