//! Show the contents of one replay

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use realm_recorder_core::{AuxPacketKind, DataSegment};

use crate::CliContext;
use crate::list::format_duration;

#[derive(Args)]
pub struct InspectArgs {
    /// Replay file (.dat)
    pub file: PathBuf,

    /// Print per-opcode packet statistics
    #[arg(long)]
    pub opcodes: bool,
}

pub fn execute(ctx: &CliContext, args: InspectArgs) -> Result<()> {
    let decoded = ctx
        .open_store()
        .read_replay(&args.file)
        .with_context(|| format!("Failed to read replay: {}", args.file.display()))?;
    let replay = &decoded.replay;
    let header = &replay.header;

    println!("=== {} ===", args.file.display());
    println!("Valid: {}", header.is_valid());
    println!("Format version: {}", header.format_version);
    println!("Game version: {}", header.replay_version);
    if let Some(version) = ctx.game_version {
        println!("Playable: {}", header.is_playable(version));
    }
    println!("Content: {}", header.content_id);
    println!("Length: {}", format_duration(header.total_ms));
    println!("Locked: {}", header.is_locked());
    println!("Completed: {}", header.is_completed());
    println!("Account: {:016X}", header.account_id);

    println!();
    println!("Chapters: {}", replay.chapters.len());
    for (index, chapter) in replay.chapters.iter().enumerate() {
        let label = replay
            .chapters
            .duration_label(index, header.total_ms)
            .unwrap_or_default();
        println!(
            "  {:>2}. kind {:>2} at {:>8} ms, offset {:#x}{label}",
            index + 1,
            chapter.kind,
            chapter.ms,
            chapter.offset
        );
    }

    println!();
    println!(
        "Segments: {} ({} bytes)",
        replay.segments.len(),
        replay.stream_len()
    );
    if let Some(e) = &decoded.stream_error {
        println!("Stream ends early: {e}");
    }

    if args.opcodes {
        println!();
        println!("{:>8} {:>8} {:>10}", "OPCODE", "COUNT", "BYTES");
        for (opcode, stats) in OpcodeStats::collect(&replay.segments).by_count() {
            let marker = match AuxPacketKind::from_opcode(opcode) {
                Some(AuxPacketKind::Rsv) => " (RSV)",
                Some(AuxPacketKind::Rsf) => " (RSF)",
                None => "",
            };
            println!(
                "{:>#8x} {:>8} {:>10}{marker}",
                opcode, stats.count, stats.bytes
            );
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpcodeCount {
    pub count: usize,
    pub bytes: usize,
}

/// Packet counts per opcode.
#[derive(Debug, Default)]
pub struct OpcodeStats {
    counts: BTreeMap<u16, OpcodeCount>,
}

impl OpcodeStats {
    pub fn collect(segments: &[DataSegment]) -> Self {
        let mut stats = Self::default();
        for segment in segments {
            let entry = stats.counts.entry(segment.opcode).or_default();
            entry.count += 1;
            entry.bytes += segment.payload.len();
        }
        stats
    }

    /// Most frequent first; ties by opcode.
    pub fn by_count(&self) -> Vec<(u16, OpcodeCount)> {
        let mut sorted: Vec<_> = self.counts.iter().map(|(op, c)| (*op, *c)).collect();
        sorted.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)));
        sorted
    }
}
