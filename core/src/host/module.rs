//! Typed interfaces over host-owned state

use crate::replay::types::{ChapterArray, ReplayHeader, SegmentRef};

/// Destination for packets captured while recording.
pub trait PacketSink {
    /// Whether the host recorder is currently persisting packets.
    fn is_saving_packets(&self) -> bool;

    /// Append one packet to the in-progress recording.
    fn write_packet(&mut self, object_id: u32, opcode: u16, data: &[u8]);
}

/// The host's native duty recorder.
///
/// Implementations are thin views over host memory; every method maps to a
/// single field access or a call into the host's own recorder.
pub trait ReplayModule: PacketSink {
    /// Content identifier carried by the zone-init packet (0 when none).
    fn init_zone_content_id(&self) -> u16;

    fn is_recording(&self) -> bool;

    fn in_playback(&self) -> bool;

    /// Whether the native loader already has a replay file open.
    fn has_loaded_file(&self) -> bool;

    /// Slot the next recording will be saved into (0-2).
    fn next_save_slot(&self) -> u8;

    /// Pin the next save slot so an existing recording is not overwritten.
    fn fix_next_save_slot(&mut self);

    fn begin_recording(&mut self);

    /// Header of the recording in progress (or being played back).
    fn replay_header(&self) -> ReplayHeader;

    fn set_replay_header(&mut self, header: ReplayHeader);

    /// Header the host keeps for a native slot.
    fn saved_header(&self, slot: u8) -> ReplayHeader;

    fn set_saved_header(&mut self, slot: u8, header: ReplayHeader);

    /// Stamp every native slot header with `account_id`.
    fn set_saved_account_ids(&mut self, account_id: u64);

    /// Native slot currently selected for playback.
    fn current_replay_slot(&self) -> u8;

    fn chapters(&self) -> &ChapterArray;

    fn chapters_mut(&mut self) -> &mut ChapterArray;

    /// Display title of the content being recorded.
    fn content_title(&self) -> String;

    /// Playback clock in replay milliseconds.
    fn playback_ms(&self) -> u32;

    /// OR `bits` into the recorder status byte.
    fn set_status_bits(&mut self, bits: u8);

    /// Generic playback handling for one segment.
    fn replay_packet(&mut self, segment: &SegmentRef<'_>) -> bool;

    /// The host's own RSV receive handling, bypassing capture.
    fn receive_rsv(&mut self, data: &[u8]) -> bool;

    /// The host's own RSF receive handling, bypassing capture.
    fn receive_rsf(&mut self, data: &[u8]) -> bool;
}

/// Content-type lookup keyed by content identifier.
pub trait ContentTypeLookup {
    fn content_type(&self, content_id: u16) -> Option<u32>;
}

/// Identity of the locally playing account.
pub trait AccountProvider {
    fn local_account_id(&self) -> u64;

    /// Whether the host UI may currently be modified (not hidden by the game).
    fn can_modify_ui(&self) -> bool {
        true
    }

    /// The host's "skip cutscenes in content" UI option.
    fn skips_cutscenes(&self) -> bool {
        false
    }
}

/// Host condition flags that other systems gate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionFlag {
    /// Set by the host during cutscene events; must read false during playback
    OccupiedInCutSceneEvent,
    /// Mirrors group pose / idle camera for plugin compatibility
    WatchingCutscene,
}

pub trait ConditionFlags {
    fn set_condition(&mut self, flag: ConditionFlag, value: bool);
}

/// Everything a [`Session`](crate::replay::runtime::Session) needs besides the module.
pub trait Host: ContentTypeLookup + AccountProvider + ConditionFlags {}

impl<T: ContentTypeLookup + AccountProvider + ConditionFlags> Host for T {}

/// A client command the host is about to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientCommand {
    pub id: u32,
    pub params: [i32; 4],
}

impl ClientCommand {
    /// Enter/leave group pose
    pub const GROUP_POSE: u32 = 201;
    /// Idle camera
    pub const IDLE_CAMERA: u32 = 1981;
    /// Group pose state change; param 0 is non-zero while active
    pub const GROUP_POSE_STATE: u32 = 314;

    pub fn new(id: u32, params: [i32; 4]) -> Self {
        Self { id, params }
    }
}
