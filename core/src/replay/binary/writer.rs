//! Binary replay format writer

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use super::{CodecError, PREFIX_SIZE};
use crate::replay::types::*;

/// Writer for binary replay format
pub struct BinaryWriter<W: Write> {
    writer: W,
}

impl<W: Write> BinaryWriter<W> {
    /// Create a new binary writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a complete replay to the output
    pub fn write_replay(&mut self, replay: &Replay) -> Result<(), CodecError> {
        self.write_parts(&replay.header, &replay.chapters, &replay.segments)
    }

    /// Write header, chapters and segments.
    ///
    /// The header's stream length is written from `segments`, not taken from
    /// `header.segment_bytes`.
    pub fn write_parts(
        &mut self,
        header: &ReplayHeader,
        chapters: &ChapterArray,
        segments: &[DataSegment],
    ) -> Result<(), CodecError> {
        for segment in segments {
            if segment.payload.len() > u16::MAX as usize {
                return Err(CodecError::PayloadTooLarge {
                    opcode: segment.opcode,
                    len: segment.payload.len(),
                });
            }
        }
        let stream_len: usize = segments.iter().map(DataSegment::encoded_len).sum();

        self.write_header(header, stream_len as u32)?;
        self.write_chapters(chapters)?;
        for segment in segments {
            self.write_segment(segment)?;
        }
        Ok(())
    }

    /// Write the 0x60-byte header
    fn write_header(
        &mut self,
        header: &ReplayHeader,
        segment_bytes: u32,
    ) -> Result<(), CodecError> {
        let w = &mut self.writer;
        w.write_all(&header.magic)?;
        w.write_u16::<LittleEndian>(header.format_version)?;
        w.write_u16::<LittleEndian>(header.os_type)?;
        w.write_u32::<LittleEndian>(header.replay_version)?;
        w.write_u32::<LittleEndian>(header.timestamp)?;
        w.write_u32::<LittleEndian>(header.total_ms)?;
        w.write_u32::<LittleEndian>(header.displayed_ms)?;
        w.write_u16::<LittleEndian>(header.content_id)?;
        w.write_all(&header.reserved_22)?;
        w.write_u8(header.info.bits())?;
        w.write_all(&header.reserved_29)?;
        w.write_u64::<LittleEndian>(header.account_id)?;
        w.write_all(&header.jobs)?;
        w.write_u8(header.player_index)?;
        w.write_all(&header.reserved_41)?;
        w.write_u32::<LittleEndian>(header.unknown_44)?;
        w.write_u32::<LittleEndian>(segment_bytes)?;
        w.write_u16::<LittleEndian>(header.unknown_4c)?;
        for name in header.npc_names {
            w.write_u16::<LittleEndian>(name)?;
        }
        w.write_u32::<LittleEndian>(header.unknown_5c)?;
        Ok(())
    }

    /// Write the count and all 64 chapter slots
    fn write_chapters(&mut self, chapters: &ChapterArray) -> Result<(), CodecError> {
        self.writer.write_u32::<LittleEndian>(chapters.raw_count())?;
        for chapter in chapters.raw_entries() {
            self.writer.write_u32::<LittleEndian>(chapter.kind)?;
            self.writer.write_u32::<LittleEndian>(chapter.offset)?;
            self.writer.write_u32::<LittleEndian>(chapter.ms)?;
        }
        Ok(())
    }

    fn write_segment(&mut self, segment: &DataSegment) -> Result<(), CodecError> {
        self.writer.write_u16::<LittleEndian>(segment.opcode)?;
        self.writer
            .write_u16::<LittleEndian>(segment.payload.len() as u16)?;
        self.writer.write_u32::<LittleEndian>(segment.ms)?;
        self.writer.write_u32::<LittleEndian>(segment.object_id)?;
        self.writer.write_all(&segment.payload)?;
        Ok(())
    }

    /// Consume the writer and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Encode a replay into a new buffer.
pub fn encode(
    header: &ReplayHeader,
    chapters: &ChapterArray,
    segments: &[DataSegment],
) -> Result<Vec<u8>, CodecError> {
    let stream_len: usize = segments.iter().map(DataSegment::encoded_len).sum();
    let mut buffer = Vec::with_capacity(PREFIX_SIZE + stream_len);
    BinaryWriter::new(&mut buffer).write_parts(header, chapters, segments)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::binary::HEADER_SIZE;

    #[test]
    fn test_write_header_layout() {
        let mut header = ReplayHeader::recorded(0x1234, 7);
        header.account_id = 0xAABB;
        header.info = ReplayInfo::LOCKED | ReplayInfo::DUTY_COMPLETED;

        let bytes = encode(&header, &ChapterArray::new(), &[]).unwrap();
        assert_eq!(bytes.len(), PREFIX_SIZE);

        assert_eq!(&bytes[0..12], b"FFXIVREPLAY\0");
        assert_eq!(&bytes[0x0C..0x0E], &5u16.to_le_bytes());
        assert_eq!(&bytes[0x10..0x14], &7u32.to_le_bytes());
        assert_eq!(&bytes[0x20..0x22], &0x1234u16.to_le_bytes());
        assert_eq!(bytes[0x28], 0b110);
        assert_eq!(&bytes[0x30..0x38], &0xAABBu64.to_le_bytes());
        assert_eq!(&bytes[0x48..0x4C], &0u32.to_le_bytes());
    }

    #[test]
    fn test_write_segment_layout() {
        let segments = [DataSegment::new(RSF_OPCODE, 0x10, AUX_OBJECT_ID, vec![7, 8])];
        let bytes = encode(&ReplayHeader::recorded(1, 1), &ChapterArray::new(), &segments).unwrap();

        assert_eq!(&bytes[0x48..0x4C], &14u32.to_le_bytes());
        let segment = &bytes[PREFIX_SIZE..];
        assert_eq!(segment, &[0x02, 0xF0, 2, 0, 0x10, 0, 0, 0, 0, 0, 0, 0xE0, 7, 8]);
    }

    #[test]
    fn test_chapter_array_written_in_full() {
        let mut chapters = ChapterArray::new();
        chapters.push(Chapter::new(5, 0, 100));

        let bytes = encode(&ReplayHeader::recorded(1, 1), &chapters, &[]).unwrap();
        let chapter_bytes = &bytes[HEADER_SIZE..PREFIX_SIZE];
        assert_eq!(&chapter_bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&chapter_bytes[4..8], &5u32.to_le_bytes());
        assert_eq!(&chapter_bytes[12..16], &100u32.to_le_bytes());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let segments = [DataSegment::new(0x10, 0, 0, vec![0; u16::MAX as usize + 1])];
        let err =
            encode(&ReplayHeader::recorded(1, 1), &ChapterArray::new(), &segments).unwrap_err();
        assert!(matches!(err, CodecError::PayloadTooLarge { opcode: 0x10, .. }));
    }
}
