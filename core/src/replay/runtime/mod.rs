//! Replay runtime
//!
//! This module contains the live side of the recorder:
//! - **Side-buffer**: Captures RSV/RSF packets until a recording can take them
//! - **Playback**: Feeds a loaded replay's segments to the host
//! - **Session**: The record/playback state machine around the host recorder

mod playback;
mod session;
mod side_buffer;

pub use playback::{LoadError, PlaybackFeed};
pub use session::{
    PlaybackTarget, RECORDABLE_CONTENT_TYPES, RecordingDecision, Session, SessionError,
    SessionPhase,
};
pub use side_buffer::{AuxPacketKind, PacketSideBuffer, RSF_PACKET_SIZE};
