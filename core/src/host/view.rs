//! Typed views over host byte buffers
//!
//! Raw offsets stay in this module; callers use named accessors.

use byteorder::{ByteOrder, LittleEndian};

/// Read-only little-endian view over a borrowed host buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    pub fn i32_at(&self, offset: usize) -> Option<i32> {
        self.bytes
            .get(offset..offset + 4)
            .map(LittleEndian::read_i32)
    }

    /// The first `len` bytes, if present.
    pub fn prefix(&self, len: usize) -> Option<&'a [u8]> {
        self.bytes.get(..len)
    }
}

/// The content director, seen through its timer flags byte.
#[derive(Debug, Clone, Copy)]
pub struct DirectorView<'a> {
    view: ByteView<'a>,
    timer_offset: u16,
}

impl<'a> DirectorView<'a> {
    /// Both timer bits set: the duty timer has started.
    const TIMER_STARTED: u8 = 0b1100;

    pub fn new(bytes: &'a [u8], timer_offset: u16) -> Self {
        Self {
            view: ByteView::new(bytes),
            timer_offset,
        }
    }

    pub fn timer_flags(&self) -> Option<u8> {
        self.view.u8_at(self.timer_offset as usize)
    }

    pub fn timer_started(&self) -> bool {
        self.timer_flags()
            .is_some_and(|flags| flags & Self::TIMER_STARTED == Self::TIMER_STARTED)
    }
}
