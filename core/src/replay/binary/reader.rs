//! Binary replay format reader
//!
//! Listings only need [`decode_prefix`]; playback walks the stream with
//! [`SegmentIter`], which stops at the first corrupt length.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

use super::{CodecError, PREFIX_SIZE, SEGMENT_HEADER_SIZE};
use crate::replay::types::*;

/// Reader for binary replay format
pub struct BinaryReader<R: Read> {
    reader: R,
}

impl<R: Read> BinaryReader<R> {
    /// Create a new binary reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read only the header and chapters.
    pub fn read_summary(&mut self) -> Result<ReplaySummary, CodecError> {
        let mut prefix = Vec::with_capacity(PREFIX_SIZE);
        self.reader
            .by_ref()
            .take(PREFIX_SIZE as u64)
            .read_to_end(&mut prefix)?;
        decode_prefix(&prefix)
    }

    /// Read the whole input and decode it.
    pub fn read_replay(&mut self) -> Result<Decoded, CodecError> {
        let mut bytes = Vec::new();
        self.reader.read_to_end(&mut bytes)?;
        decode(&bytes)
    }
}

/// Result of a full decode.
///
/// A corrupt segment stream is not fatal: `replay.segments` holds everything
/// parsed before the fault and `stream_error` records the fault.
#[derive(Debug)]
pub struct Decoded {
    pub replay: Replay,
    pub stream_error: Option<CodecError>,
}

/// Decode the fixed header + chapter prefix.
pub fn decode_prefix(bytes: &[u8]) -> Result<ReplaySummary, CodecError> {
    if bytes.len() < PREFIX_SIZE {
        return Err(CodecError::TruncatedInput {
            needed: PREFIX_SIZE,
            available: bytes.len(),
        });
    }

    let mut cursor = Cursor::new(&bytes[..PREFIX_SIZE]);
    let header = read_header(&mut cursor)?;
    let chapters = read_chapters(&mut cursor)?;
    Ok(ReplaySummary { header, chapters })
}

/// Decode a complete container.
pub fn decode(bytes: &[u8]) -> Result<Decoded, CodecError> {
    let ReplaySummary { header, chapters } = decode_prefix(bytes)?;

    let mut segments = Vec::new();
    let mut stream_error = None;
    for item in SegmentIter::new(segment_stream(bytes, &header)) {
        match item {
            Ok(segment) => segments.push(segment.to_owned()),
            Err(e) => {
                stream_error = Some(e);
                break;
            }
        }
    }

    Ok(Decoded {
        replay: Replay {
            header,
            chapters,
            segments,
        },
        stream_error,
    })
}

/// The segment stream of a container, bounded by the header's length field
/// and by the bytes actually present.
pub fn segment_stream<'a>(bytes: &'a [u8], header: &ReplayHeader) -> &'a [u8] {
    let data = bytes.get(PREFIX_SIZE..).unwrap_or(&[]);
    let bound = (header.segment_bytes as usize).min(data.len());
    &data[..bound]
}

fn read_header(reader: &mut impl Read) -> io::Result<ReplayHeader> {
    let mut magic = [0u8; 12];
    reader.read_exact(&mut magic)?;
    let format_version = reader.read_u16::<LittleEndian>()?;
    let os_type = reader.read_u16::<LittleEndian>()?;
    let replay_version = reader.read_u32::<LittleEndian>()?;
    let timestamp = reader.read_u32::<LittleEndian>()?;
    let total_ms = reader.read_u32::<LittleEndian>()?;
    let displayed_ms = reader.read_u32::<LittleEndian>()?;
    let content_id = reader.read_u16::<LittleEndian>()?;
    let mut reserved_22 = [0u8; 6];
    reader.read_exact(&mut reserved_22)?;
    let info = ReplayInfo::from_bits_retain(reader.read_u8()?);
    let mut reserved_29 = [0u8; 7];
    reader.read_exact(&mut reserved_29)?;
    let account_id = reader.read_u64::<LittleEndian>()?;
    let mut jobs = [0u8; 8];
    reader.read_exact(&mut jobs)?;
    let player_index = reader.read_u8()?;
    let mut reserved_41 = [0u8; 3];
    reader.read_exact(&mut reserved_41)?;
    let unknown_44 = reader.read_u32::<LittleEndian>()?;
    let segment_bytes = reader.read_u32::<LittleEndian>()?;
    let unknown_4c = reader.read_u16::<LittleEndian>()?;
    let mut npc_names = [0u16; 7];
    reader.read_u16_into::<LittleEndian>(&mut npc_names)?;
    let unknown_5c = reader.read_u32::<LittleEndian>()?;

    Ok(ReplayHeader {
        magic,
        format_version,
        os_type,
        replay_version,
        timestamp,
        total_ms,
        displayed_ms,
        content_id,
        reserved_22,
        info,
        reserved_29,
        account_id,
        jobs,
        player_index,
        reserved_41,
        unknown_44,
        segment_bytes,
        unknown_4c,
        npc_names,
        unknown_5c,
    })
}

fn read_chapters(reader: &mut impl Read) -> io::Result<ChapterArray> {
    let count = reader.read_u32::<LittleEndian>()?;
    let mut entries = [Chapter::default(); CHAPTER_CAPACITY];
    for entry in entries.iter_mut() {
        entry.kind = reader.read_u32::<LittleEndian>()?;
        entry.offset = reader.read_u32::<LittleEndian>()?;
        entry.ms = reader.read_u32::<LittleEndian>()?;
    }
    Ok(ChapterArray::from_raw(count, entries))
}

/// Walks a segment stream by cumulative byte offset.
///
/// Yields at most one error, after which iteration ends.
#[derive(Debug, Clone)]
pub struct SegmentIter<'a> {
    stream: &'a [u8],
    offset: u32,
    done: bool,
}

impl<'a> SegmentIter<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self::starting_at(stream, 0)
    }

    /// Start walking at a byte offset (e.g. a chapter's offset).
    pub fn starting_at(stream: &'a [u8], offset: u32) -> Self {
        Self {
            stream,
            offset,
            done: false,
        }
    }

    /// Offset of the next segment to be yielded.
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = Result<SegmentRef<'a>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.offset as usize;
        if self.done || start >= self.stream.len() {
            return None;
        }

        let remaining = self.stream.len() - start;
        let rest = &self.stream[start..];
        if remaining < SEGMENT_HEADER_SIZE {
            self.done = true;
            return Some(Err(CodecError::InvalidSegmentLength {
                offset: self.offset,
                length: SEGMENT_HEADER_SIZE,
                remaining,
            }));
        }

        let opcode = LittleEndian::read_u16(&rest[0..2]);
        let data_length = LittleEndian::read_u16(&rest[2..4]) as usize;
        let ms = LittleEndian::read_u32(&rest[4..8]);
        let object_id = LittleEndian::read_u32(&rest[8..12]);

        let length = SEGMENT_HEADER_SIZE + data_length;
        if length > remaining {
            self.done = true;
            return Some(Err(CodecError::InvalidSegmentLength {
                offset: self.offset,
                length,
                remaining,
            }));
        }

        let segment = SegmentRef {
            offset: self.offset,
            opcode,
            ms,
            object_id,
            payload: &rest[SEGMENT_HEADER_SIZE..length],
        };
        self.offset += length as u32;
        Some(Ok(segment))
    }
}

/// Offset of the first segment at or after `ms`, if any.
pub fn find_segment_at(stream: &[u8], ms: u32) -> Option<u32> {
    SegmentIter::new(stream)
        .map_while(Result::ok)
        .find(|segment| segment.ms >= ms)
        .map(|segment| segment.offset)
}
