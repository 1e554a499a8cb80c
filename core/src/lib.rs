//! Realm Recorder Core - duty replay capture, storage and playback
//!
//! This crate sits between a host simulation client's native duty recorder
//! and the filesystem. It owns the replay container format, buffers the two
//! auxiliary packet kinds the native recorder drops, coordinates recording and
//! playback through the host's lifecycle callbacks, and manages the replay
//! directory (auto-rename, recycle, archive).
//!
//! # Architecture
//!
//! - [`replay::binary`] - Encode/decode of the `.dat` container
//! - [`replay::runtime`] - Side-buffer, playback feed and the [`Session`] state machine
//! - [`store`] - Directory-backed [`ReplayStore`]
//! - [`host`] - Collaborator traits and the hook/patch resolution step
//! - [`config`] - User-facing limits and toggles

pub mod config;
pub mod host;
#[cfg(test)]
mod integration;
pub mod replay;
pub mod store;
#[cfg(test)]
pub mod test_utils;

pub use config::RecorderConfig;
pub use host::{
    AccountProvider, ConditionFlag, ConditionFlags, ContentTypeLookup, Host, HostCapabilities,
    PacketSink, ReplayModule,
};
pub use replay::{
    Chapter, ChapterArray, CodecError, DataSegment, Replay, ReplayHeader, ReplayInfo,
    ReplaySummary, SegmentRef,
};
pub use replay::runtime::{
    AuxPacketKind, LoadError, PacketSideBuffer, PlaybackFeed, PlaybackTarget, RecordingDecision,
    Session, SessionError, SessionPhase,
};
pub use store::{
    ArchiveReport, ReplayEntry, ReplayStore, RetentionLimits, StoreError, StoreLayout,
};
