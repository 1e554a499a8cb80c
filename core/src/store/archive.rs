//! Archive container for replays that can no longer be played

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::StoreError;

/// One file to add to the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Name inside the archive
    pub name: String,
    /// File whose bytes become the entry
    pub source: PathBuf,
}

/// An append-only archive file format.
pub trait ArchiveFormat {
    /// Names of the entries in the archive at `path`.
    ///
    /// A missing or zero-length file is an empty archive.
    fn entry_names(&self, path: &Path) -> Result<Vec<String>, StoreError>;

    /// Add `entries` to the archive at `path`, creating it if needed.
    fn append(&self, path: &Path, entries: &[ArchiveEntry]) -> Result<(), StoreError>;
}

/// Deflate-compressed zip archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveFormat;

impl ZipArchiveFormat {
    fn has_content(path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|meta| meta.len() > 0)
    }
}

impl ArchiveFormat for ZipArchiveFormat {
    fn entry_names(&self, path: &Path) -> Result<Vec<String>, StoreError> {
        if !Self::has_content(path) {
            return Ok(Vec::new());
        }

        let file = File::open(path).map_err(StoreError::io("open", path))?;
        let archive = ZipArchive::new(file).map_err(StoreError::archive(path))?;
        Ok(archive.file_names().map(String::from).collect())
    }

    fn append(&self, path: &Path, entries: &[ArchiveEntry]) -> Result<(), StoreError> {
        let existing = Self::has_content(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(!existing)
            .open(path)
            .map_err(StoreError::io("open", path))?;

        let mut writer = if existing {
            ZipWriter::new_append(file).map_err(StoreError::archive(path))?
        } else {
            ZipWriter::new(file)
        };

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for entry in entries {
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(StoreError::archive(path))?;
            let mut source =
                File::open(&entry.source).map_err(StoreError::io("open", &entry.source))?;
            io::copy(&mut source, &mut writer).map_err(StoreError::io("compress", &entry.source))?;
        }
        writer.finish().map_err(StoreError::archive(path))?;
        Ok(())
    }
}
