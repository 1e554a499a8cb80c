//! List valid replays

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Args;

use realm_recorder_core::ReplayHeader;

use crate::CliContext;

#[derive(Args)]
pub struct ListArgs {
    /// Only show replays the given --game-version cannot play
    #[arg(long)]
    pub outdated: bool,
}

pub fn execute(ctx: &CliContext, args: ListArgs) -> Result<()> {
    let mut store = ctx.open_store();
    let entries = store.list();
    if entries.is_empty() {
        println!("No replays in {}", ctx.dir.display());
        return Ok(());
    }

    println!(
        "{:<48} {:>7} {:>16} {:>8} {:>3}  FLAGS",
        "NAME", "CONTENT", "RECORDED", "LENGTH", "CH"
    );
    for entry in entries {
        let header = entry.header();
        let outdated = ctx
            .game_version
            .is_some_and(|version| !header.is_playable(version));
        if args.outdated && !outdated {
            continue;
        }

        println!(
            "{:<48} {:>7} {:>16} {:>8} {:>3}  {}",
            entry.file_name(),
            header.content_id,
            format_timestamp(header.timestamp),
            format_duration(header.total_ms),
            entry.summary.chapters.len(),
            flags(header, outdated),
        );
    }
    Ok(())
}

/// `m:ss`, or `h:mm:ss` past an hour.
pub fn format_duration(ms: u32) -> String {
    let seconds = ms / 1000;
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

fn format_timestamp(unix_seconds: u32) -> String {
    DateTime::from_timestamp(i64::from(unix_seconds), 0)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn flags(header: &ReplayHeader, outdated: bool) -> String {
    let mut flags = Vec::new();
    if header.is_locked() {
        flags.push("locked");
    }
    if header.is_completed() {
        flags.push("completed");
    }
    if outdated {
        flags.push("outdated");
    }
    flags.join(",")
}
