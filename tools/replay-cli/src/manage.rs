//! Rename, delete and archive replays

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use realm_recorder_core::config;

use crate::CliContext;

#[derive(Args)]
pub struct RenameArgs {
    /// Replay file (.dat)
    pub file: PathBuf,

    /// New name, without extension
    pub name: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Replay file (.dat)
    pub file: PathBuf,
}

pub fn rename(ctx: &CliContext, args: RenameArgs) -> Result<()> {
    let target = ctx
        .open_store()
        .rename(&args.file, &args.name)
        .with_context(|| format!("Failed to rename {}", args.file.display()))?;
    println!("Renamed to {}", target.display());
    Ok(())
}

pub fn delete(ctx: &CliContext, args: DeleteArgs) -> Result<()> {
    let mut store = ctx.open_store();
    store
        .delete(&args.file)
        .with_context(|| format!("Failed to delete {}", args.file.display()))?;
    if store.limits().max_deleted > 0 {
        println!("Moved {} to deleted/", args.file.display());
    } else {
        println!("Deleted {}", args.file.display());
    }
    Ok(())
}

pub fn archive(ctx: &CliContext) -> Result<()> {
    let Some(version) = ctx.game_version else {
        bail!("--game-version is required to decide which replays are outdated");
    };

    let report = ctx
        .open_store()
        .archive()
        .with_context(|| format!("Failed to archive replays in {}", ctx.dir.display()))?;
    if report.archived.is_empty() {
        println!("Nothing to archive for game version {version}");
        return Ok(());
    }

    for name in &report.archived {
        println!("  {name}");
    }
    println!(
        "Archived {} replay(s), removed {} file(s)",
        report.archived.len(),
        report.removed
    );
    Ok(())
}

pub fn show_config(ctx: &CliContext) -> Result<()> {
    match config::config_dir() {
        Some(dir) => println!("# {}", dir.join("config.toml").display()),
        None => println!("# no config directory"),
    }
    let config = &ctx.config;
    println!("replay_dir = {:?}", ctx.dir.display().to_string());
    println!("max_auto_renamed_replays = {}", config.max_auto_renamed_replays);
    println!("max_deleted_replays = {}", config.max_deleted_replays);
    println!("enable_recording_icon = {}", config.enable_recording_icon);
    if let Some(path) = &config.last_loaded_replay {
        println!("last_loaded_replay = {:?}", path.display().to_string());
    }
    Ok(())
}
