//! Shared test utilities for integration and unit tests

use std::collections::HashMap;
use std::path::Path;

use crate::host::{
    AccountProvider, ConditionFlag, ConditionFlags, ContentTypeLookup, PacketSink, ReplayModule,
};
use crate::replay::binary::encode;
use crate::replay::types::{ChapterArray, DataSegment, ReplayHeader, SegmentRef};

// ============================================================================
// Test Recorder Module
// ============================================================================

pub const TEST_ACCOUNT: u64 = 0x0040_0000_0123_ABCD;
pub const TEST_GAME_VERSION: u32 = 6_500;

/// In-memory stand-in for the host duty recorder.
#[derive(Debug, Default)]
pub struct TestModule {
    pub zone_content_id: u16,
    pub recording: bool,
    pub saving: bool,
    pub playback: bool,
    pub loaded_file: bool,
    pub next_slot: u8,
    pub slot_fixed: bool,
    pub header: ReplayHeader,
    pub saved_headers: [ReplayHeader; 3],
    pub saved_account_id: u64,
    pub current_slot: u8,
    pub chapters: ChapterArray,
    pub title: String,
    pub playback_ms: u32,
    pub status: u8,
    /// Packets written into the recording: (object id, opcode, data)
    pub written: Vec<(u32, u16, Vec<u8>)>,
    /// Opcodes given to the generic packet handler
    pub replayed: Vec<u16>,
    pub rsv_received: Vec<Vec<u8>>,
    pub rsf_received: Vec<Vec<u8>>,
}

impl TestModule {
    pub fn new() -> Self {
        Self {
            title: "The Aery".to_string(),
            ..Default::default()
        }
    }
}

impl PacketSink for TestModule {
    fn is_saving_packets(&self) -> bool {
        self.saving
    }

    fn write_packet(&mut self, object_id: u32, opcode: u16, data: &[u8]) {
        self.written.push((object_id, opcode, data.to_vec()));
    }
}

impl ReplayModule for TestModule {
    fn init_zone_content_id(&self) -> u16 {
        self.zone_content_id
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn in_playback(&self) -> bool {
        self.playback
    }

    fn has_loaded_file(&self) -> bool {
        self.loaded_file
    }

    fn next_save_slot(&self) -> u8 {
        self.next_slot
    }

    fn fix_next_save_slot(&mut self) {
        self.slot_fixed = true;
    }

    fn begin_recording(&mut self) {
        self.recording = true;
        self.saving = true;
        self.header = ReplayHeader::recorded(self.zone_content_id, TEST_GAME_VERSION);
        self.header.account_id = TEST_ACCOUNT;
    }

    fn replay_header(&self) -> ReplayHeader {
        self.header.clone()
    }

    fn set_replay_header(&mut self, header: ReplayHeader) {
        self.header = header;
    }

    fn saved_header(&self, slot: u8) -> ReplayHeader {
        self.saved_headers[slot as usize].clone()
    }

    fn set_saved_header(&mut self, slot: u8, header: ReplayHeader) {
        self.saved_headers[slot as usize] = header;
    }

    fn set_saved_account_ids(&mut self, account_id: u64) {
        self.saved_account_id = account_id;
        for header in &mut self.saved_headers {
            header.account_id = account_id;
        }
    }

    fn current_replay_slot(&self) -> u8 {
        self.current_slot
    }

    fn chapters(&self) -> &ChapterArray {
        &self.chapters
    }

    fn chapters_mut(&mut self) -> &mut ChapterArray {
        &mut self.chapters
    }

    fn content_title(&self) -> String {
        self.title.clone()
    }

    fn playback_ms(&self) -> u32 {
        self.playback_ms
    }

    fn set_status_bits(&mut self, bits: u8) {
        self.status |= bits;
    }

    fn replay_packet(&mut self, segment: &SegmentRef<'_>) -> bool {
        self.replayed.push(segment.opcode);
        true
    }

    fn receive_rsv(&mut self, data: &[u8]) -> bool {
        self.rsv_received.push(data.to_vec());
        true
    }

    fn receive_rsf(&mut self, data: &[u8]) -> bool {
        self.rsf_received.push(data.to_vec());
        true
    }
}

// ============================================================================
// Test Host
// ============================================================================

/// Host state other than the recorder.
#[derive(Debug)]
pub struct TestHost {
    pub account_id: u64,
    pub content_types: HashMap<u16, u32>,
    pub ui_visible: bool,
    pub skip_cutscenes: bool,
    pub conditions: HashMap<ConditionFlag, bool>,
}

impl Default for TestHost {
    fn default() -> Self {
        Self {
            account_id: TEST_ACCOUNT,
            content_types: HashMap::from([(1020, 2), (30_034, 5), (77, 6)]),
            ui_visible: true,
            skip_cutscenes: false,
            conditions: HashMap::new(),
        }
    }
}

impl ContentTypeLookup for TestHost {
    fn content_type(&self, content_id: u16) -> Option<u32> {
        self.content_types.get(&content_id).copied()
    }
}

impl AccountProvider for TestHost {
    fn local_account_id(&self) -> u64 {
        self.account_id
    }

    fn can_modify_ui(&self) -> bool {
        self.ui_visible
    }

    fn skips_cutscenes(&self) -> bool {
        self.skip_cutscenes
    }
}

impl ConditionFlags for TestHost {
    fn set_condition(&mut self, flag: ConditionFlag, value: bool) {
        self.conditions.insert(flag, value);
    }
}

// ============================================================================
// Replay Files
// ============================================================================

/// Write a valid replay recorded on `replay_version` and return its header.
pub fn write_replay(
    path: &Path,
    replay_version: u32,
    chapters: &ChapterArray,
    segments: &[DataSegment],
) -> ReplayHeader {
    let mut header = ReplayHeader::recorded(1020, replay_version);
    header.total_ms = segments.last().map_or(0, |segment| segment.ms);
    let bytes = encode(&header, chapters, segments).unwrap();
    std::fs::write(path, bytes).unwrap();
    header
}

/// Write a playable replay with no chapters or segments.
pub fn write_empty_replay(path: &Path) -> ReplayHeader {
    write_replay(path, TEST_GAME_VERSION, &ChapterArray::new(), &[])
}
