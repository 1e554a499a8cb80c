//! Packet side-buffer
//!
//! RSV and RSF packets arrive before a recording starts saving. They are
//! queued here and written into the recording, under reserved opcodes, the
//! moment it begins.

use crate::host::PacketSink;
use crate::host::view::ByteView;
use crate::replay::binary::CodecError;
use crate::replay::types::{AUX_OBJECT_ID, RSF_OPCODE, RSV_OPCODE};

/// Fixed size of an RSF packet.
pub const RSF_PACKET_SIZE: usize = 0x48;

/// Bytes of an RSV packet beyond its declared value size.
const RSV_FIXED_SIZE: usize = 4 + 0x30;

/// The two packet kinds the side-buffer captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxPacketKind {
    /// Value-sheet packet
    Rsv,
    /// Format-sheet packet
    Rsf,
}

impl AuxPacketKind {
    /// Reserved opcode the kind is recorded under.
    pub fn opcode(self) -> u16 {
        match self {
            Self::Rsv => RSV_OPCODE,
            Self::Rsf => RSF_OPCODE,
        }
    }

    pub fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode {
            RSV_OPCODE => Some(Self::Rsv),
            RSF_OPCODE => Some(Self::Rsf),
            _ => None,
        }
    }

    /// Size of the packet of this kind starting at `data`.
    ///
    /// RSV packets lead with an `i32` value size; a negative size yields `None`.
    pub fn packet_len(self, data: &[u8]) -> Option<usize> {
        match self {
            Self::Rsf => Some(RSF_PACKET_SIZE),
            Self::Rsv => {
                let value_size = ByteView::new(data).i32_at(0)?;
                usize::try_from(value_size)
                    .ok()
                    .map(|size| size + RSV_FIXED_SIZE)
            }
        }
    }
}

/// Queues of captured RSV and RSF packets, in arrival order.
#[derive(Debug, Default)]
pub struct PacketSideBuffer {
    rsv: Vec<Vec<u8>>,
    rsf: Vec<Vec<u8>>,
}

impl PacketSideBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a copy of one complete packet.
    pub fn capture(&mut self, kind: AuxPacketKind, bytes: &[u8]) {
        self.queue_mut(kind).push(bytes.to_vec());
    }

    /// Queue the packet at the start of a raw receive buffer, sized by kind.
    ///
    /// Returns the number of bytes captured.
    pub fn capture_raw(&mut self, kind: AuxPacketKind, data: &[u8]) -> Result<usize, CodecError> {
        let len = kind.packet_len(data).unwrap_or(usize::MAX);
        let packet = ByteView::new(data)
            .prefix(len)
            .ok_or(CodecError::TruncatedInput {
                needed: len,
                available: data.len(),
            })?;
        self.capture(kind, packet);
        Ok(len)
    }

    pub fn len(&self, kind: AuxPacketKind) -> usize {
        match kind {
            AuxPacketKind::Rsv => self.rsv.len(),
            AuxPacketKind::Rsf => self.rsf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rsv.is_empty() && self.rsf.is_empty()
    }

    /// Write every queued packet into `sink` and empty both queues.
    ///
    /// Packets are written only while the sink is saving; the queues are
    /// cleared either way. RSF packets go first, then RSV. Returns the number
    /// of packets written.
    pub fn flush<S: PacketSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let mut written = 0;
        if sink.is_saving_packets() {
            for packet in &self.rsf {
                sink.write_packet(AUX_OBJECT_ID, RSF_OPCODE, packet);
                written += 1;
            }
            for packet in &self.rsv {
                sink.write_packet(AUX_OBJECT_ID, RSV_OPCODE, packet);
                written += 1;
            }
        } else if !self.is_empty() {
            tracing::debug!(
                rsf = self.rsf.len(),
                rsv = self.rsv.len(),
                "Recorder not saving, discarding side-buffer"
            );
        }
        self.clear();
        written
    }

    pub fn clear(&mut self) {
        self.rsv.clear();
        self.rsf.clear();
    }

    fn queue_mut(&mut self, kind: AuxPacketKind) -> &mut Vec<Vec<u8>> {
        match kind {
            AuxPacketKind::Rsv => &mut self.rsv,
            AuxPacketKind::Rsf => &mut self.rsf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        saving: bool,
        written: Vec<(u32, u16, Vec<u8>)>,
    }

    impl PacketSink for RecordingSink {
        fn is_saving_packets(&self) -> bool {
            self.saving
        }

        fn write_packet(&mut self, object_id: u32, opcode: u16, data: &[u8]) {
            self.written.push((object_id, opcode, data.to_vec()));
        }
    }

    fn rsv_packet(value: &[u8]) -> Vec<u8> {
        let mut packet = (value.len() as i32).to_le_bytes().to_vec();
        packet.extend_from_slice(&[0xAA; 0x30]);
        packet.extend_from_slice(value);
        packet
    }

    #[test]
    fn test_flush_orders_rsf_before_rsv() {
        let mut buffer = PacketSideBuffer::new();
        buffer.capture(AuxPacketKind::Rsv, &[1]);
        buffer.capture(AuxPacketKind::Rsf, &[2]);
        buffer.capture(AuxPacketKind::Rsv, &[3]);
        buffer.capture(AuxPacketKind::Rsf, &[4]);

        let mut sink = RecordingSink {
            saving: true,
            ..Default::default()
        };
        assert_eq!(buffer.flush(&mut sink), 4);

        let order: Vec<(u16, u8)> = sink
            .written
            .iter()
            .map(|(object_id, opcode, data)| {
                assert_eq!(*object_id, AUX_OBJECT_ID);
                (*opcode, data[0])
            })
            .collect();
        assert_eq!(
            order,
            vec![(RSF_OPCODE, 2), (RSF_OPCODE, 4), (RSV_OPCODE, 1), (RSV_OPCODE, 3)]
        );
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut buffer = PacketSideBuffer::new();
        buffer.capture(AuxPacketKind::Rsf, &[0; RSF_PACKET_SIZE]);

        let mut sink = RecordingSink {
            saving: true,
            ..Default::default()
        };
        assert_eq!(buffer.flush(&mut sink), 1);
        assert_eq!(buffer.flush(&mut sink), 0);
        assert_eq!(sink.written.len(), 1);
    }

    #[test]
    fn test_flush_clears_when_not_saving() {
        let mut buffer = PacketSideBuffer::new();
        buffer.capture(AuxPacketKind::Rsv, &[1]);
        buffer.capture(AuxPacketKind::Rsf, &[2]);

        let mut sink = RecordingSink::default();
        assert_eq!(buffer.flush(&mut sink), 0);
        assert!(sink.written.is_empty());
        assert!(buffer.is_empty());

        sink.saving = true;
        assert_eq!(buffer.flush(&mut sink), 0);
    }

    #[test]
    fn test_capture_raw_sizes_packets() {
        let mut buffer = PacketSideBuffer::new();

        let mut receive = rsv_packet(b"value");
        receive.extend_from_slice(&[0xFF; 16]);
        assert_eq!(buffer.capture_raw(AuxPacketKind::Rsv, &receive).unwrap(), 0x34 + 5);

        let receive = vec![7u8; RSF_PACKET_SIZE + 8];
        assert_eq!(
            buffer.capture_raw(AuxPacketKind::Rsf, &receive).unwrap(),
            RSF_PACKET_SIZE
        );

        let mut sink = RecordingSink {
            saving: true,
            ..Default::default()
        };
        buffer.flush(&mut sink);
        assert_eq!(sink.written[0].2.len(), RSF_PACKET_SIZE);
        assert_eq!(sink.written[1].2, rsv_packet(b"value"));
    }

    #[test]
    fn test_capture_raw_rejects_short_buffers() {
        let mut buffer = PacketSideBuffer::new();

        let err = buffer
            .capture_raw(AuxPacketKind::Rsf, &[0; 0x20])
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::TruncatedInput {
                needed: RSF_PACKET_SIZE,
                available: 0x20
            }
        ));

        // Negative value size
        let packet = (-1i32).to_le_bytes();
        assert!(buffer.capture_raw(AuxPacketKind::Rsv, &packet).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_kind_opcodes() {
        for kind in [AuxPacketKind::Rsv, AuxPacketKind::Rsf] {
            assert_eq!(AuxPacketKind::from_opcode(kind.opcode()), Some(kind));
        }
        assert_eq!(AuxPacketKind::from_opcode(0x0142), None);
    }
}
