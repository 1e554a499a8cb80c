//! Duty replay system
//!
//! A replay is one `.dat` file per recorded session:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ ReplayHeader   (0x60 bytes)  │
//! ├──────────────────────────────┤
//! │ ChapterArray   (0x304 bytes) │
//! ├──────────────────────────────┤
//! │ DataSegment... (variable)    │
//! └──────────────────────────────┘
//! ```
//!
//! The fixed prefix (header + chapters) is all a listing needs; playback walks
//! the segment stream by cumulative byte offset.

pub mod binary;
pub mod runtime;
pub mod types;

pub use binary::{
    BinaryReader, BinaryWriter, CodecError, Decoded, SegmentIter, decode, decode_prefix, encode,
};
pub use types::{
    AUX_OBJECT_ID, Chapter, ChapterArray, DataSegment, RSF_OPCODE, RSV_OPCODE, Replay,
    ReplayHeader, ReplayInfo, ReplaySummary, SegmentRef,
};
