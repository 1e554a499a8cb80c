//! Replay store
//!
//! The on-disk collection of replay files under one root directory:
//!
//! ```text
//! <root>/
//! ├─ *.dat                 native slot files and user-named replays
//! ├─ autorenamed/*.dat     finished recordings, bounded by retention
//! ├─ deleted/*.dat         recycle area, bounded by retention
//! ├─ archive.zip           replays the current game build cannot play
//! └─ archive.zip.BACKUP    present only while an archive append is in flight
//! ```
//!
//! Listings are cached and invalidated by every mutation. Every mutating
//! operation logs its own failure before returning it, so callers may simply
//! discard the error.

mod archive;
pub mod naming;

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDateTime;

pub use archive::{ArchiveEntry, ArchiveFormat, ZipArchiveFormat};

use crate::replay::binary::{BinaryReader, CodecError, Decoded};
use crate::replay::types::{ReplayHeader, ReplaySummary};
use naming::{
    auto_rename_stem, claim_name, is_replay_file, sanitize_file_name, slot_file_name, unique_path,
};

/// Highest native slot index.
pub const MAX_NATIVE_SLOT: u8 = 2;

/// Failure of a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to {action} {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {path:?}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("archive {path:?}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Entry count after an append did not match what was written
    #[error("archive holds {actual} entries after append, expected {expected}")]
    IntegrityMismatch { expected: usize, actual: usize },

    #[error("{0:?} is not a usable replay name")]
    InvalidName(String),

    #[error("{0:?} already exists")]
    AlreadyExists(PathBuf),

    #[error("no replay named {0:?}")]
    NotFound(String),

    #[error("slot {0} is not a native replay slot")]
    InvalidSlot(u8),
}

impl StoreError {
    pub(crate) fn io<'a>(
        action: &'static str,
        path: &'a Path,
    ) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn archive(path: &Path) -> impl FnOnce(zip::result::ZipError) -> Self + '_ {
        move |source| Self::Archive {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory layout of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn auto_renamed_dir(&self) -> PathBuf {
        self.root.join("autorenamed")
    }

    pub fn deleted_dir(&self) -> PathBuf {
        self.root.join("deleted")
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root.join("archive.zip")
    }

    /// Sibling copy of the archive kept while an append is in flight.
    pub fn archive_backup_path(&self) -> PathBuf {
        self.root.join("archive.zip.BACKUP")
    }

    /// Path of a native slot file.
    pub fn slot_path(&self, account_id: u64, slot: u8) -> PathBuf {
        self.root.join(slot_file_name(account_id, slot))
    }
}

/// Upper bounds on the retention directories. Zero disables the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionLimits {
    pub max_auto_renamed: u32,
    pub max_deleted: u32,
}

impl Default for RetentionLimits {
    fn default() -> Self {
        Self {
            max_auto_renamed: 30,
            max_deleted: 10,
        }
    }
}

/// One listed replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    pub path: PathBuf,
    pub summary: ReplaySummary,
}

impl ReplayEntry {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    pub fn header(&self) -> &ReplayHeader {
        &self.summary.header
    }
}

/// Result of a successful archive pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Entry names added to the archive
    pub archived: Vec<String>,
    /// Source files removed after the archive was verified
    pub removed: usize,
}

/// Pre-append state of the archive, used to put it back on failure.
enum ArchiveSnapshot {
    /// No archive file existed
    Absent,
    /// The archive had no entries; its raw bytes are held here
    Bytes(Vec<u8>),
    /// The archive was copied to the backup path
    Backup(PathBuf),
}

/// Filesystem store of replay files.
pub struct ReplayStore {
    layout: StoreLayout,
    limits: RetentionLimits,
    /// Game build used to decide which replays are archived
    game_version: u32,
    format: Box<dyn ArchiveFormat>,
    cache: Option<Vec<ReplayEntry>>,
}

impl ReplayStore {
    pub fn new(layout: StoreLayout, limits: RetentionLimits, game_version: u32) -> Self {
        Self {
            layout,
            limits,
            game_version,
            format: Box::new(ZipArchiveFormat),
            cache: None,
        }
    }

    /// Replace the archive format.
    pub fn with_archive_format(mut self, format: Box<dyn ArchiveFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn limits(&self) -> RetentionLimits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: RetentionLimits) {
        self.limits = limits;
        self.invalidate();
    }

    pub fn game_version(&self) -> u32 {
        self.game_version
    }

    /// Valid replays in the root and `autorenamed/`, sorted by file name.
    ///
    /// Served from cache until the next mutation.
    pub fn list(&mut self) -> &[ReplayEntry] {
        if self.cache.is_none() {
            self.cache = Some(self.scan());
        }
        self.cache.as_deref().unwrap_or_default()
    }

    /// Drop the cache and list again.
    pub fn refresh(&mut self) -> &[ReplayEntry] {
        self.invalidate();
        self.list()
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    fn scan(&self) -> Vec<ReplayEntry> {
        let mut dirs = vec![self.layout.root().to_path_buf()];
        let auto_renamed = self.layout.auto_renamed_dir();
        if auto_renamed.is_dir() {
            dirs.push(auto_renamed);
        } else if self.limits.max_auto_renamed > 0 {
            match fs::create_dir_all(&auto_renamed) {
                Ok(()) => dirs.push(auto_renamed),
                Err(e) => tracing::warn!(
                    path = %auto_renamed.display(),
                    error = %e,
                    "Failed to create auto-rename directory"
                ),
            }
        }

        let mut entries = Vec::new();
        for dir in dirs {
            let read_dir = match fs::read_dir(&dir) {
                Ok(read_dir) => read_dir,
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "Failed to list replays");
                    continue;
                }
            };

            for path in read_dir.filter_map(Result::ok).map(|entry| entry.path()) {
                if !path.is_file() || !is_replay_file(&path) {
                    continue;
                }
                match read_summary(&path) {
                    Ok(summary) if summary.header.is_valid() => {
                        entries.push(ReplayEntry { path, summary })
                    }
                    Ok(_) => tracing::debug!(path = %path.display(), "Skipping non-replay file"),
                    Err(e) => tracing::warn!(error = %e, "Skipping unreadable replay"),
                }
            }
        }

        entries.sort_by(|a, b| {
            a.file_name()
                .cmp(b.file_name())
                .then_with(|| a.path.cmp(&b.path))
        });
        entries
    }

    /// Decode a whole replay file.
    pub fn read_replay(&self, path: &Path) -> Result<Decoded, StoreError> {
        let file = File::open(path).map_err(StoreError::io("open", path))?;
        BinaryReader::new(BufReader::new(file))
            .read_replay()
            .map_err(|source| StoreError::Codec {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Give a replay a new name in the root directory.
    pub fn rename(&mut self, path: &Path, new_name: &str) -> Result<PathBuf, StoreError> {
        let result = self.rename_inner(path, new_name);
        self.invalidate();
        result.inspect_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to rename replay")
        })
    }

    fn rename_inner(&self, path: &Path, new_name: &str) -> Result<PathBuf, StoreError> {
        let stem = sanitize_file_name(new_name);
        if stem.is_empty() {
            return Err(StoreError::InvalidName(new_name.to_string()));
        }

        let target = self
            .layout
            .root()
            .join(format!("{stem}.{}", naming::REPLAY_EXTENSION));
        if target.exists() {
            if is_same_file(path, &target) {
                return Ok(target);
            }
            return Err(StoreError::AlreadyExists(target));
        }

        fs::rename(path, &target).map_err(StoreError::io("rename", path))?;
        tracing::info!(from = %path.display(), to = %target.display(), "Renamed replay");
        Ok(target)
    }

    /// Move a just-finished slot recording into `autorenamed/`.
    ///
    /// Returns the new path, or `None` when auto-rename is disabled.
    pub fn auto_rename(
        &mut self,
        slot_file: &str,
        title: &str,
        finished_at: NaiveDateTime,
    ) -> Result<Option<PathBuf>, StoreError> {
        let result = self.auto_rename_inner(slot_file, title, finished_at);
        self.invalidate();
        result.inspect_err(|e| {
            tracing::error!(slot_file, error = %e, "Failed to auto-rename recording")
        })
    }

    fn auto_rename_inner(
        &mut self,
        slot_file: &str,
        title: &str,
        finished_at: NaiveDateTime,
    ) -> Result<Option<PathBuf>, StoreError> {
        if self.limits.max_auto_renamed == 0 {
            return Ok(None);
        }

        let source = self
            .refresh()
            .iter()
            .find(|entry| entry.file_name() == slot_file)
            .map(|entry| entry.path.clone())
            .ok_or_else(|| StoreError::NotFound(slot_file.to_string()))?;

        let dir = self.layout.auto_renamed_dir();
        fs::create_dir_all(&dir).map_err(StoreError::io("create", &dir))?;
        let target = unique_path(&dir, &auto_rename_stem(title, finished_at));
        fs::rename(&source, &target).map_err(StoreError::io("rename", &source))?;
        tracing::info!(path = %target.display(), "Auto-renamed recording");

        let max = self.limits.max_auto_renamed as usize;
        loop {
            let files = files_oldest_first(&dir)?;
            let Some(oldest) = files.first().filter(|_| files.len() > max) else {
                break;
            };
            self.delete_inner(oldest)?;
        }
        Ok(Some(target))
    }

    /// Delete a replay, recycling it into `deleted/` when enabled.
    pub fn delete(&mut self, path: &Path) -> Result<(), StoreError> {
        let result = self.delete_inner(path);
        self.invalidate();
        result.inspect_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to delete replay")
        })
    }

    fn delete_inner(&self, path: &Path) -> Result<(), StoreError> {
        if self.limits.max_deleted == 0 {
            fs::remove_file(path).map_err(StoreError::io("delete", path))?;
            tracing::info!(path = %path.display(), "Deleted replay");
            return Ok(());
        }

        let dir = self.layout.deleted_dir();
        fs::create_dir_all(&dir).map_err(StoreError::io("create", &dir))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| StoreError::InvalidName(path.display().to_string()))?;
        let target = dir.join(file_name);
        // Same-directory rename replaces an existing recycled copy
        fs::rename(path, &target).map_err(StoreError::io("recycle", path))?;
        tracing::info!(path = %path.display(), "Moved replay to deleted");

        let max = self.limits.max_deleted as usize;
        let files = files_oldest_first(&dir)?;
        if files.len() > max {
            for oldest in &files[..files.len() - max] {
                fs::remove_file(oldest).map_err(StoreError::io("delete", oldest))?;
                tracing::debug!(path = %oldest.display(), "Evicted deleted replay");
            }
        }
        Ok(())
    }

    /// Copy a replay over a native slot file.
    pub fn copy_into_slot(
        &mut self,
        source: &Path,
        account_id: u64,
        slot: u8,
    ) -> Result<PathBuf, StoreError> {
        let result = if slot > MAX_NATIVE_SLOT {
            Err(StoreError::InvalidSlot(slot))
        } else {
            let target = self.layout.slot_path(account_id, slot);
            fs::copy(source, &target)
                .map(|_| target)
                .map_err(StoreError::io("copy", source))
        };
        self.invalidate();
        result.inspect_err(|e| {
            tracing::error!(
                path = %source.display(),
                slot,
                error = %e,
                "Failed to copy replay into slot"
            )
        })
    }

    /// Move every root-level replay the current build cannot play into the
    /// archive.
    ///
    /// Source files are removed only after the archive is verified. On any
    /// failure the archive is put back exactly as it was and no source file
    /// is touched.
    pub fn archive(&mut self) -> Result<ArchiveReport, StoreError> {
        let result = self.archive_inner();
        self.invalidate();
        result.inspect_err(|e| tracing::error!(error = %e, "Failed to archive replays"))
    }

    fn archive_inner(&mut self) -> Result<ArchiveReport, StoreError> {
        let root = self.layout.root().to_path_buf();
        let game_version = self.game_version;
        let candidates: Vec<PathBuf> = self
            .refresh()
            .iter()
            .filter(|entry| entry.path.parent() == Some(root.as_path()))
            .filter(|entry| !entry.summary.header.is_playable(game_version))
            .map(|entry| entry.path.clone())
            .collect();
        if candidates.is_empty() {
            return Ok(ArchiveReport::default());
        }

        let archive = self.layout.archive_path();
        let existing = self.format.entry_names(&archive)?;
        let before = existing.len();
        let snapshot = self.snapshot_archive(&archive, before)?;

        let mut taken: HashSet<String> = existing.into_iter().collect();
        let entries: Vec<ArchiveEntry> = candidates
            .iter()
            .map(|source| ArchiveEntry {
                name: claim_name(
                    &mut taken,
                    &source.file_name().unwrap_or_default().to_string_lossy(),
                ),
                source: source.clone(),
            })
            .collect();

        let appended = self.format.append(&archive, &entries).and_then(|()| {
            let expected = before + entries.len();
            let actual = self.format.entry_names(&archive)?.len();
            if actual == expected {
                Ok(())
            } else {
                Err(StoreError::IntegrityMismatch { expected, actual })
            }
        });
        if let Err(e) = appended {
            restore_archive(&archive, snapshot);
            return Err(e);
        }

        if let ArchiveSnapshot::Backup(backup) = snapshot
            && let Err(e) = fs::remove_file(&backup)
        {
            tracing::warn!(
                path = %backup.display(),
                error = %e,
                "Failed to remove archive backup"
            );
        }

        let mut removed = 0;
        for source in &candidates {
            match fs::remove_file(source) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(
                    path = %source.display(),
                    error = %e,
                    "Archived replay could not be removed"
                ),
            }
        }

        tracing::info!(archived = entries.len(), removed, "Archived unplayable replays");
        Ok(ArchiveReport {
            archived: entries.into_iter().map(|entry| entry.name).collect(),
            removed,
        })
    }

    fn snapshot_archive(
        &self,
        archive: &Path,
        entries: usize,
    ) -> Result<ArchiveSnapshot, StoreError> {
        if entries > 0 {
            let backup = self.layout.archive_backup_path();
            fs::copy(archive, &backup).map_err(StoreError::io("back up", archive))?;
            Ok(ArchiveSnapshot::Backup(backup))
        } else if archive.exists() {
            let bytes = fs::read(archive).map_err(StoreError::io("read", archive))?;
            Ok(ArchiveSnapshot::Bytes(bytes))
        } else {
            Ok(ArchiveSnapshot::Absent)
        }
    }
}

/// Both paths resolve to the same existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn restore_archive(archive: &Path, snapshot: ArchiveSnapshot) {
    let restored = match snapshot {
        ArchiveSnapshot::Absent if archive.exists() => fs::remove_file(archive),
        ArchiveSnapshot::Absent => Ok(()),
        ArchiveSnapshot::Bytes(bytes) => fs::write(archive, bytes),
        ArchiveSnapshot::Backup(backup) => {
            fs::copy(&backup, archive).and_then(|_| fs::remove_file(&backup))
        }
    };
    match restored {
        Ok(()) => tracing::warn!(path = %archive.display(), "Restored archive after failed append"),
        Err(e) => tracing::error!(
            path = %archive.display(),
            error = %e,
            "Failed to restore archive; backup left in place"
        ),
    }
}

fn read_summary(path: &Path) -> Result<ReplaySummary, StoreError> {
    let file = File::open(path).map_err(StoreError::io("open", path))?;
    BinaryReader::new(BufReader::new(file))
        .read_summary()
        .map_err(|source| StoreError::Codec {
            path: path.to_path_buf(),
            source,
        })
}

/// Replay files in `dir`, oldest first by creation time.
///
/// Falls back to modification time where creation time is unavailable; ties
/// break by path.
fn files_oldest_first(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let read_dir = fs::read_dir(dir).map_err(StoreError::io("list", dir))?;
    let mut files: Vec<(Option<SystemTime>, PathBuf)> = read_dir
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_replay_file(path))
        .map(|path| {
            let age = fs::metadata(&path)
                .and_then(|meta| meta.created().or_else(|_| meta.modified()))
                .ok();
            (age, path)
        })
        .collect();
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::binary::encode;
    use crate::replay::types::ChapterArray;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const GAME_VERSION: u32 = 7_000;

    fn write_replay(path: &Path, replay_version: u32) {
        let header = ReplayHeader::recorded(1020, replay_version);
        let bytes = encode(&header, &ChapterArray::new(), &[]).unwrap();
        fs::write(path, bytes).unwrap();
    }

    fn store(dir: &TempDir, limits: RetentionLimits) -> ReplayStore {
        ReplayStore::new(StoreLayout::new(dir.path()), limits, GAME_VERSION)
    }

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(20, 15, second)
            .unwrap()
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_replay(&dir.path().join("b.dat"), GAME_VERSION);
        write_replay(&dir.path().join("a.dat"), GAME_VERSION);
        fs::write(dir.path().join("junk.dat"), vec![0u8; 2_000]).unwrap();
        fs::write(dir.path().join("short.dat"), b"FFXIV").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let mut store = store(&dir, RetentionLimits::default());
        let names: Vec<&str> = store.list().iter().map(ReplayEntry::file_name).collect();
        assert_eq!(names, vec!["a.dat", "b.dat"]);
        assert!(dir.path().join("autorenamed").is_dir());
    }

    #[test]
    fn test_list_is_cached_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir, RetentionLimits::default());
        assert!(store.list().is_empty());

        write_replay(&dir.path().join("late.dat"), GAME_VERSION);
        assert!(store.list().is_empty());
        assert_eq!(store.refresh().len(), 1);
    }

    #[test]
    fn test_list_without_auto_rename_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(
            &dir,
            RetentionLimits {
                max_auto_renamed: 0,
                max_deleted: 0,
            },
        );
        assert!(store.list().is_empty());
        assert!(!dir.path().join("autorenamed").exists());
    }

    #[test]
    fn test_rename_sanitizes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("FFXIV_0000000000000001_000.dat");
        write_replay(&source, GAME_VERSION);

        let mut store = store(&dir, RetentionLimits::default());
        let renamed = store.rename(&source, "Best: Run?").unwrap();
        assert_eq!(renamed, dir.path().join("Best Run.dat"));
        assert!(!source.exists());
        assert_eq!(store.list()[0].file_name(), "Best Run.dat");
    }

    #[test]
    fn test_rename_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.dat");
        let other = dir.path().join("b.dat");
        write_replay(&source, GAME_VERSION);
        write_replay(&other, GAME_VERSION);

        let mut store = store(&dir, RetentionLimits::default());
        assert!(matches!(
            store.rename(&source, "<>|").unwrap_err(),
            StoreError::InvalidName(_)
        ));
        assert!(matches!(
            store.rename(&source, "b").unwrap_err(),
            StoreError::AlreadyExists(_)
        ));
        assert!(source.exists());
    }

    #[test]
    fn test_rename_to_current_name_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("Best Run.dat");
        write_replay(&source, GAME_VERSION);
        fs::create_dir(dir.path().join("autorenamed")).unwrap();

        let mut store = store(&dir, RetentionLimits::default());
        let indirect = dir.path().join("autorenamed").join("..").join("Best Run.dat");
        let renamed = store.rename(&indirect, "Best Run").unwrap();
        assert_eq!(renamed, dir.path().join("Best Run.dat"));
        assert!(source.exists());
    }

    #[test]
    fn test_auto_rename_moves_slot_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot_file = slot_file_name(0xABCD, 1);
        write_replay(&dir.path().join(&slot_file), GAME_VERSION);

        let mut store = store(&dir, RetentionLimits::default());
        let moved = store
            .auto_rename(&slot_file, "The Aery", at(3))
            .unwrap()
            .unwrap();
        assert_eq!(
            moved,
            dir.path().join("autorenamed/The Aery 2024.05.01 20.15.03.dat")
        );
        assert!(!dir.path().join(&slot_file).exists());
    }

    #[test]
    fn test_auto_rename_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let slot_file = slot_file_name(1, 0);
        write_replay(&dir.path().join(&slot_file), GAME_VERSION);

        let mut store = store(
            &dir,
            RetentionLimits {
                max_auto_renamed: 0,
                max_deleted: 10,
            },
        );
        assert_eq!(store.auto_rename(&slot_file, "Title", at(0)).unwrap(), None);
        assert!(dir.path().join(&slot_file).exists());
    }

    #[test]
    fn test_auto_rename_missing_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir, RetentionLimits::default());
        let err = store.auto_rename("FFXIV_x.dat", "Title", at(0)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_delete_recycles_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.dat");
        write_replay(&path, GAME_VERSION);

        let mut store = store(&dir, RetentionLimits::default());
        store.delete(&path).unwrap();
        assert!(!path.exists());
        assert!(dir.path().join("deleted/run.dat").exists());

        write_replay(&path, 1);
        store.delete(&path).unwrap();
        let recycled = fs::read(dir.path().join("deleted/run.dat")).unwrap();
        assert_eq!(&recycled[0x10..0x14], &1u32.to_le_bytes());
    }

    #[test]
    fn test_delete_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(
            &dir,
            RetentionLimits {
                max_auto_renamed: 0,
                max_deleted: 0,
            },
        );
        let err = store.delete(&dir.path().join("gone.dat")).unwrap_err();
        assert!(matches!(err, StoreError::Io { action: "delete", .. }));
    }

    #[test]
    fn test_copy_into_slot() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("keep.dat");
        write_replay(&source, GAME_VERSION);

        let mut store = store(&dir, RetentionLimits::default());
        let target = store.copy_into_slot(&source, 0x42, 2).unwrap();
        assert_eq!(target, dir.path().join("FFXIV_0000000000000042_002.dat"));
        assert_eq!(fs::read(&source).unwrap(), fs::read(&target).unwrap());
        assert_eq!(store.list().len(), 2);

        assert!(matches!(
            store.copy_into_slot(&source, 0x42, 3).unwrap_err(),
            StoreError::InvalidSlot(3)
        ));
    }

    #[test]
    fn test_archive_nothing_to_do() {
        let dir = tempfile::tempdir().unwrap();
        write_replay(&dir.path().join("current.dat"), GAME_VERSION);

        let mut store = store(&dir, RetentionLimits::default());
        assert_eq!(store.archive().unwrap(), ArchiveReport::default());
        assert!(!dir.path().join("archive.zip").exists());
    }

    #[test]
    fn test_archive_moves_unplayable_replays() {
        let dir = tempfile::tempdir().unwrap();
        write_replay(&dir.path().join("current.dat"), GAME_VERSION);
        write_replay(&dir.path().join("old.dat"), GAME_VERSION - 1);
        fs::create_dir_all(dir.path().join("autorenamed")).unwrap();
        write_replay(&dir.path().join("autorenamed/old.dat"), 1);

        let mut store = store(&dir, RetentionLimits::default());
        let report = store.archive().unwrap();
        assert_eq!(report.archived, vec!["old.dat"]);
        assert_eq!(report.removed, 1);

        assert!(!dir.path().join("old.dat").exists());
        assert!(dir.path().join("current.dat").exists());
        assert!(dir.path().join("autorenamed/old.dat").exists());
        assert!(!dir.path().join("archive.zip.BACKUP").exists());

        // A second unplayable replay with the same name is stored alongside
        write_replay(&dir.path().join("old.dat"), GAME_VERSION - 2);
        let report = store.archive().unwrap();
        assert_eq!(report.archived, vec!["old (2).dat"]);

        let mut names = ZipArchiveFormat
            .entry_names(&dir.path().join("archive.zip"))
            .unwrap();
        names.sort();
        assert_eq!(names, vec!["old (2).dat", "old.dat"]);
    }
}
