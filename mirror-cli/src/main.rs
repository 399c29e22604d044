//! # usermirror
//!
//! Offline-first mirror of a remote user directory.
//!
//! ## Commands
//!
//! - `refresh`: Replace the local copy with the remote directory
//! - `list`: Refresh, then print pages of the (optionally filtered) list
//! - `show`: Print one locally stored user
//! - `status`: Show what is stored locally and when it was synced
//!
//! ## Example
//!
//! ```bash
//! # Mirror the directory
//! usermirror refresh
//!
//! # First two pages of users whose name or email contains "ali"
//! usermirror list --query ali --pages 2
//!
//! # Details, served from the local copy
//! usermirror show 3
//!
//! # Try everything without network access
//! usermirror --mock --database /tmp/users.db list
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mirror_client::{HttpSource, MockSource, SyncEngine, UserSource};
use mirror_store::SqliteUserStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{list, refresh, show, status};
use config::Settings;

/// Offline-first mirror of a remote user directory.
#[derive(Parser, Debug)]
#[command(name = "usermirror")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: usermirror.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database holding the local copy
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Use a built-in sample directory instead of the remote (for testing/demo)
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace the local copy with the remote directory
    Refresh,

    /// Refresh, then print the user list
    List {
        /// Only users whose name or email contains this text
        #[arg(long, short)]
        query: Option<String>,

        /// Number of pages to load
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
    },

    /// Print one locally stored user
    Show {
        /// User ID
        id: i64,
    },

    /// Show local copy status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(cli.config.as_deref(), cli.database)?;

    if cli.mock {
        run(cli.command, &settings, MockSource::sample(), "mock").await
    } else {
        let remote = &settings.config.remote;
        let source = HttpSource::new(&remote.base_url, remote.timeout())
            .context("Failed to create HTTP client")?;
        let label = source.url().to_string();
        run(cli.command, &settings, source, &label).await
    }
}

async fn run<S: UserSource + 'static>(
    command: Commands,
    settings: &Settings,
    source: S,
    source_label: &str,
) -> Result<()> {
    let store = SqliteUserStore::open(&settings.database)
        .await
        .with_context(|| format!("Failed to open {}", settings.database.display()))?;
    let store = Arc::new(store);
    tracing::debug!("Using database {}", settings.database.display());

    match command {
        Commands::Refresh => {
            refresh::run(SyncEngine::new(source, store), source_label).await?;
        }
        Commands::List { query, pages } => {
            let engine = SyncEngine::new(source, store);
            list::run(engine, &settings.config.pagination, query.as_deref(), pages).await?;
        }
        Commands::Show { id } => {
            show::run(store.as_ref(), id).await?;
        }
        Commands::Status => {
            status::run(store.as_ref(), &settings.database, source_label).await?;
        }
    }

    Ok(())
}
