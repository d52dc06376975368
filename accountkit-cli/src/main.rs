//! Developer CLI for `AccountKit`: create XMPP accounts and edit their
//! STUN/TURN and Jingle Nodes lists against a local JSON store.

mod commands;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use accountkit_core::RegistrationConfig;
use clap::Parser;
use eyre::eyre;

use crate::commands::{Commands, Context};
use crate::store::FileStore;

#[derive(clap::Parser, Debug)]
#[command(name = "accountkit", version, about)]
struct Cli {
    /// Path of the account store (defaults to the platform data directory)
    #[arg(long, global = true, env = "ACCOUNTKIT_STORE")]
    store: Option<PathBuf>,

    /// Skip media service lookup; encodings keep their defaults
    #[arg(long, global = true)]
    no_media: bool,

    /// Print machine-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

fn default_store_path() -> eyre::Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("accountkit").join("accounts.json"))
        .ok_or_else(|| eyre!("no data directory on this platform; pass --store"))
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = match cli.store {
        Some(path) => path,
        None => default_store_path()?,
    };
    tracing::debug!(path = %path.display(), "opening account store");

    let ctx = Context {
        store: Arc::new(FileStore::open(&path)?),
        config: RegistrationConfig::default().with_media_disabled(cli.no_media),
        json: cli.json,
    };
    commands::run(cli.command, &ctx)
}
