//! Replay playback feed
//!
//! A loaded replay file, held in memory, and the cursor that feeds its
//! segments to the host as the playback clock advances. Dropping the feed
//! unloads the file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::replay::binary::{
    CodecError, SegmentIter, decode_prefix, find_segment_at, segment_stream,
};
use crate::replay::types::{ChapterArray, ReplayHeader, ReplaySummary, SegmentRef};

/// Failure to load a replay for playback.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path:?}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("{path:?} is not a replay file")]
    InvalidHeader { path: PathBuf },
}

/// A replay loaded for playback.
pub struct PlaybackFeed {
    path: PathBuf,
    bytes: Vec<u8>,
    summary: ReplaySummary,
    cursor: u32,
    finished: bool,
}

impl PlaybackFeed {
    /// Read and validate a replay file.
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path.to_path_buf(), bytes)
    }

    /// Validate an in-memory replay.
    pub fn from_bytes(path: PathBuf, bytes: Vec<u8>) -> Result<Self, LoadError> {
        let summary = match decode_prefix(&bytes) {
            Ok(summary) => summary,
            Err(source) => return Err(LoadError::Codec { path, source }),
        };
        if !summary.header.is_valid() {
            return Err(LoadError::InvalidHeader { path });
        }

        Ok(Self {
            path,
            bytes,
            summary,
            cursor: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &ReplayHeader {
        &self.summary.header
    }

    pub fn chapters(&self) -> &ChapterArray {
        &self.summary.chapters
    }

    pub fn summary(&self) -> &ReplaySummary {
        &self.summary
    }

    /// The segment stream, bounded by the header and the bytes on disk.
    pub fn stream(&self) -> &[u8] {
        segment_stream(&self.bytes, &self.summary.header)
    }

    /// Offset of the next segment to be fed.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// The stream is exhausted or hit a corrupt segment.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The well-formed segment starting at `offset`, if any.
    pub fn segment_at(&self, offset: u32) -> Option<SegmentRef<'_>> {
        SegmentIter::starting_at(self.stream(), offset).next()?.ok()
    }

    /// Feed every segment due at `now_ms` to `dispatch`.
    ///
    /// Returns the number of segments dispatched. A corrupt segment ends the
    /// feed the same way the end of the stream does.
    pub fn advance(&mut self, now_ms: u32, mut dispatch: impl FnMut(&SegmentRef<'_>)) -> usize {
        if self.finished {
            return 0;
        }

        let stream = segment_stream(&self.bytes, &self.summary.header);
        let mut iter = SegmentIter::starting_at(stream, self.cursor);
        let mut dispatched = 0;
        loop {
            let offset = iter.offset();
            match iter.next() {
                Some(Ok(segment)) if segment.ms > now_ms => {
                    self.cursor = offset;
                    break;
                }
                Some(Ok(segment)) => {
                    dispatch(&segment);
                    dispatched += 1;
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Replay stream ends early"
                    );
                    self.cursor = offset;
                    self.finished = true;
                    break;
                }
                None => {
                    self.cursor = iter.offset();
                    self.finished = true;
                    break;
                }
            }
        }
        dispatched
    }

    /// Move the cursor to a segment boundary.
    ///
    /// Returns `false` (leaving the cursor alone) when `offset` does not start
    /// a well-formed segment.
    pub fn seek(&mut self, offset: u32) -> bool {
        if self.segment_at(offset).is_none() {
            return false;
        }
        self.cursor = offset;
        self.finished = false;
        true
    }

    /// Jump to the start of chapter `index`.
    pub fn seek_to_chapter(&mut self, index: usize) -> bool {
        match self.summary.chapters.get(index) {
            Some(chapter) => {
                let offset = chapter.offset;
                self.seek(offset)
            }
            None => false,
        }
    }

    /// Jump to the first segment at or after `ms`.
    pub fn seek_to_ms(&mut self, ms: u32) -> bool {
        match find_segment_at(self.stream(), ms) {
            Some(offset) => self.seek(offset),
            None => false,
        }
    }

    /// Length of chapter `index`, looking ahead to the next chapter.
    pub fn chapter_duration_ms(&self, index: usize) -> Option<u32> {
        self.summary
            .chapters
            .duration_ms(index, self.summary.header.total_ms)
    }
}

impl std::fmt::Debug for PlaybackFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackFeed")
            .field("path", &self.path)
            .field("bytes", &self.bytes.len())
            .field("cursor", &self.cursor)
            .field("finished", &self.finished)
            .finish()
    }
}
