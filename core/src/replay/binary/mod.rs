//! Binary replay container (.dat)
//!
//! All numeric fields are little-endian and fixed width. There is no schema
//! version beyond the header magic: an invalid header is the only
//! forward-compatibility signal.
//!
//! # File Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Header (0x60 bytes)                          │
//! │ ├─ magic: [u8; 12]  "FFXIVREPLAY\0"          │
//! │ ├─ versions, timestamps, content id, info    │
//! │ ├─ account_id: u64                           │
//! │ └─ segment_bytes: u32 (at 0x48)              │
//! ├──────────────────────────────────────────────┤
//! │ Chapters (0x304 bytes)                       │
//! │ ├─ count: u32                                │
//! │ └─ 64 × { kind: u32, offset: u32, ms: u32 }  │
//! ├──────────────────────────────────────────────┤
//! │ Segments (segment_bytes, offset-addressed)   │
//! │ └─ { opcode: u16, len: u16, ms: u32,         │
//! │      object_id: u32, payload[len] } ...      │
//! └──────────────────────────────────────────────┘
//! ```

mod reader;
mod writer;

use std::io;

pub use reader::{
    BinaryReader, Decoded, SegmentIter, decode, decode_prefix, find_segment_at, segment_stream,
};
pub use writer::{BinaryWriter, encode};

/// Size of the fixed replay header.
pub const HEADER_SIZE: usize = 0x60;

/// Size of one chapter entry.
pub const CHAPTER_SIZE: usize = 12;

/// Size of the chapter array (count + 64 entries).
pub const CHAPTER_ARRAY_SIZE: usize = 4 + CHAPTER_SIZE * crate::replay::types::CHAPTER_CAPACITY;

/// Size of the fixed prefix read by listings.
pub const PREFIX_SIZE: usize = HEADER_SIZE + CHAPTER_ARRAY_SIZE;

/// Size of a segment header preceding its payload.
pub const SEGMENT_HEADER_SIZE: usize = 12;

/// Malformed or unencodable container data.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Fewer bytes than the fixed header + chapter prefix
    #[error("truncated input: need {needed} bytes, have {available}")]
    TruncatedInput { needed: usize, available: usize },

    /// A segment's declared length runs past the end of the stream
    #[error("invalid segment length {length} at offset {offset} ({remaining} bytes remain)")]
    InvalidSegmentLength {
        offset: u32,
        length: usize,
        remaining: usize,
    },

    /// Payload too large for the 16-bit length field
    #[error("segment payload of {len} bytes does not fit opcode {opcode:#06X}")]
    PayloadTooLarge { opcode: u16, len: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}
