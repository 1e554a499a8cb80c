//! Core types for the replay container
//!
//! These mirror the host's on-disk structures field for field. Reserved and
//! unknown bytes are carried through untouched so a decoded file re-encodes
//! to the same bytes.

use std::fmt;

/// Magic prefix of every valid replay header.
pub const REPLAY_MAGIC: [u8; 12] = *b"FFXIVREPLAY\0";

/// Container format version the host currently plays back.
pub const CURRENT_FORMAT_VERSION: u16 = 5;

/// Number of chapter entries in the fixed chapter array.
pub const CHAPTER_CAPACITY: usize = 64;

/// Reserved opcode for RSV (value-sheet) packets captured by the side-buffer.
pub const RSV_OPCODE: u16 = 0xF001;

/// Reserved opcode for RSF (format-sheet) packets captured by the side-buffer.
pub const RSF_OPCODE: u16 = 0xF002;

/// Object id stamped on side-buffer segments.
pub const AUX_OBJECT_ID: u32 = 0xE000_0000;

bitflags::bitflags! {
    /// Slot metadata bits stored in the header's info byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ReplayInfo: u8 {
        /// Recorded on the current game build
        const UP_TO_DATE = 0b0000_0001;
        /// Protected from the host's own slot overwrite
        const LOCKED = 0b0000_0010;
        /// The duty was completed during the recording
        const DUTY_COMPLETED = 0b0000_0100;
    }
}

/// Fixed-size replay header (0x60 bytes on disk).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplayHeader {
    pub magic: [u8; 12],
    pub format_version: u16,
    /// 3 = Windows, 5 = Mac
    pub os_type: u16,
    /// Game build the replay was recorded on
    pub replay_version: u32,
    /// Unix seconds at recording start
    pub timestamp: u32,
    pub total_ms: u32,
    pub displayed_ms: u32,
    /// Content (duty) identifier
    pub content_id: u16,
    pub reserved_22: [u8; 6],
    pub info: ReplayInfo,
    pub reserved_29: [u8; 7],
    /// Owning account; cleared for portability while recording
    pub account_id: u64,
    pub jobs: [u8; 8],
    pub player_index: u8,
    pub reserved_41: [u8; 3],
    pub unknown_44: u32,
    /// Length of the segment stream in bytes
    pub segment_bytes: u32,
    pub unknown_4c: u16,
    pub npc_names: [u16; 7],
    pub unknown_5c: u32,
}

impl ReplayHeader {
    /// A valid header for `content_id` recorded on `replay_version`.
    pub fn recorded(content_id: u16, replay_version: u32) -> Self {
        Self {
            magic: REPLAY_MAGIC,
            format_version: CURRENT_FORMAT_VERSION,
            os_type: 3,
            replay_version,
            content_id,
            info: ReplayInfo::UP_TO_DATE,
            ..Default::default()
        }
    }

    /// The sole gate for inclusion in any listing.
    pub fn is_valid(&self) -> bool {
        self.magic == REPLAY_MAGIC
    }

    /// Whether the host running `game_version` can play this replay back.
    pub fn is_playable(&self, game_version: u32) -> bool {
        self.is_valid()
            && self.format_version == CURRENT_FORMAT_VERSION
            && self.replay_version == game_version
    }

    pub fn is_locked(&self) -> bool {
        self.info.contains(ReplayInfo::LOCKED)
    }

    pub fn is_completed(&self) -> bool {
        self.info.contains(ReplayInfo::DUTY_COMPLETED)
    }
}

/// A single chapter marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chapter {
    pub kind: u32,
    /// Cumulative byte offset into the segment stream
    pub offset: u32,
    pub ms: u32,
}

impl Chapter {
    /// Barrier drop as the host emits it for trial content.
    pub const BARRIER_DROP_TRIAL: u32 = 1;
    /// Canonical barrier drop value.
    pub const BARRIER_DROP: u32 = 5;

    pub fn new(kind: u32, offset: u32, ms: u32) -> Self {
        Self { kind, offset, ms }
    }
}

/// Fixed-capacity chapter array (0x304 bytes on disk).
///
/// Entries past `count` are kept verbatim but are not live chapters.
#[derive(Clone, PartialEq, Eq)]
pub struct ChapterArray {
    count: u32,
    entries: [Chapter; CHAPTER_CAPACITY],
}

impl Default for ChapterArray {
    fn default() -> Self {
        Self {
            count: 0,
            entries: [Chapter::default(); CHAPTER_CAPACITY],
        }
    }
}

impl fmt::Debug for ChapterArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl ChapterArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from raw on-disk parts.
    pub fn from_raw(count: u32, entries: [Chapter; CHAPTER_CAPACITY]) -> Self {
        Self { count, entries }
    }

    /// The count field as stored, which may exceed the capacity in corrupt files.
    pub fn raw_count(&self) -> u32 {
        self.count
    }

    pub fn raw_entries(&self) -> &[Chapter; CHAPTER_CAPACITY] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        (self.count as usize).min(CHAPTER_CAPACITY)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Chapter> {
        self.entries[..self.len()].get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Chapter> {
        let len = self.len();
        self.entries[..len].get_mut(index)
    }

    /// Append a chapter. Returns `false` when the array is full.
    pub fn push(&mut self, chapter: Chapter) -> bool {
        let len = self.len();
        if len == CHAPTER_CAPACITY {
            return false;
        }
        self.entries[len] = chapter;
        self.count = len as u32 + 1;
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chapter> {
        self.entries[..self.len()].iter()
    }

    /// Rewrite a trial-type barrier drop on chapter 0 to the canonical value.
    ///
    /// Returns `true` if the chapter was changed.
    pub fn normalize_start_marker(&mut self) -> bool {
        match self.get_mut(0) {
            Some(start) if start.kind == Chapter::BARRIER_DROP_TRIAL => {
                start.kind = Chapter::BARRIER_DROP;
                true
            }
            _ => false,
        }
    }

    /// Milliseconds between chapter `index` and the one after it.
    ///
    /// When the following entry lies before this one (unused or wrapped), the
    /// end of the replay is used instead.
    pub fn duration_ms(&self, index: usize, total_ms: u32) -> Option<u32> {
        let current = self.get(index)?.ms;
        let mut next = self
            .entries
            .get(index + 1)
            .map_or(0, |chapter| chapter.ms);
        if next < current {
            next = total_ms.saturating_add(self.entries[0].ms);
        }
        Some(next.saturating_sub(current))
    }

    /// Display suffix for chapter `index`, e.g. ` (03:27)`.
    pub fn duration_label(&self, index: usize, total_ms: u32) -> Option<String> {
        let ms = self.duration_ms(index, total_ms)?;
        let seconds = ms / 1000;
        Some(format!(" ({:02}:{:02})", seconds / 60, seconds % 60))
    }
}

/// Owned data segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    pub opcode: u16,
    pub ms: u32,
    pub object_id: u32,
    pub payload: Vec<u8>,
}

impl DataSegment {
    pub fn new(opcode: u16, ms: u32, object_id: u32, payload: Vec<u8>) -> Self {
        Self {
            opcode,
            ms,
            object_id,
            payload,
        }
    }

    /// Encoded length including the 12-byte segment header.
    pub fn encoded_len(&self) -> usize {
        crate::replay::binary::SEGMENT_HEADER_SIZE + self.payload.len()
    }
}

/// Borrowed view of one segment inside a loaded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRef<'a> {
    /// Byte offset of this segment within the stream
    pub offset: u32,
    pub opcode: u16,
    pub ms: u32,
    pub object_id: u32,
    pub payload: &'a [u8],
}

impl SegmentRef<'_> {
    pub fn encoded_len(&self) -> u32 {
        (crate::replay::binary::SEGMENT_HEADER_SIZE + self.payload.len()) as u32
    }

    /// Offset of the segment that follows this one.
    pub fn next_offset(&self) -> u32 {
        self.offset + self.encoded_len()
    }

    pub fn to_owned(&self) -> DataSegment {
        DataSegment::new(self.opcode, self.ms, self.object_id, self.payload.to_vec())
    }
}

/// Header and chapters only: what a listing reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    pub header: ReplayHeader,
    pub chapters: ChapterArray,
}

/// Complete replay data (in-memory representation)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Replay {
    pub header: ReplayHeader,
    pub chapters: ChapterArray,
    pub segments: Vec<DataSegment>,
}

impl Replay {
    /// Build a replay, syncing the header's stream length to `segments`.
    pub fn new(header: ReplayHeader, chapters: ChapterArray, segments: Vec<DataSegment>) -> Self {
        let mut replay = Self {
            header,
            chapters,
            segments,
        };
        replay.header.segment_bytes = replay.stream_len() as u32;
        replay
    }

    /// Total encoded size of the segment stream.
    pub fn stream_len(&self) -> usize {
        self.segments.iter().map(DataSegment::encoded_len).sum()
    }

    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            header: self.header.clone(),
            chapters: self.chapters.clone(),
        }
    }
}
