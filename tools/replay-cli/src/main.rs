//! Realm Replay CLI - Inspect and manage a duty replay directory
//!
//! # Commands
//!
//! - `realm-replay list` - List valid replays with their header summary
//! - `realm-replay inspect <file>` - Show header, chapters and opcode statistics
//! - `realm-replay rename <file> <name>` - Rename a replay (sanitized)
//! - `realm-replay delete <file>` - Recycle or delete a replay
//! - `realm-replay archive --game-version <n>` - Zip replays the game can no longer play
//! - `realm-replay config` - Print the effective configuration
//!
//! The replay directory comes from `--dir`, then `replay_dir` in
//! `config.toml`, then the platform data directory.

mod inspect;
mod list;
mod manage;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use realm_recorder_core::{RecorderConfig, ReplayStore, StoreLayout, config};

/// Realm Replay CLI - Inspect and manage duty replays
#[derive(Parser)]
#[command(name = "realm-replay")]
#[command(about = "Inspect and manage duty replay directories")]
#[command(version)]
struct Cli {
    /// Replay directory (overrides config.toml)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Game build replays must match to count as playable
    #[arg(long, global = true)]
    game_version: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List valid replays
    List(list::ListArgs),

    /// Show header, chapters and opcode statistics of one replay
    Inspect(inspect::InspectArgs),

    /// Rename a replay into the replay directory
    Rename(manage::RenameArgs),

    /// Recycle (or delete) a replay
    Delete(manage::DeleteArgs),

    /// Move unplayable replays into archive.zip
    Archive,

    /// Print the effective configuration
    Config,
}

/// Everything a subcommand needs to open the store.
pub struct CliContext {
    pub config: RecorderConfig,
    pub dir: PathBuf,
    pub game_version: Option<u32>,
}

impl CliContext {
    pub fn open_store(&self) -> ReplayStore {
        ReplayStore::new(
            StoreLayout::new(&self.dir),
            self.config.retention(),
            self.game_version.unwrap_or_default(),
        )
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load();
    let dir = match cli.dir {
        Some(dir) => dir,
        None => config
            .resolve_replay_dir()
            .context("No replay directory: pass --dir or set replay_dir in config.toml")?,
    };
    let ctx = CliContext {
        config,
        dir,
        game_version: cli.game_version,
    };

    match cli.command {
        Commands::List(args) => list::execute(&ctx, args),
        Commands::Inspect(args) => inspect::execute(&ctx, args),
        Commands::Rename(args) => manage::rename(&ctx, args),
        Commands::Delete(args) => manage::delete(&ctx, args),
        Commands::Archive => manage::archive(&ctx),
        Commands::Config => manage::show_config(&ctx),
    }
}
