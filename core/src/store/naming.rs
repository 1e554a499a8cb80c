//! Replay file naming

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Extension every replay file carries.
pub const REPLAY_EXTENSION: &str = "dat";

/// Native slot file name for an account, e.g. `FFXIV_0011223344556677_002.dat`.
pub fn slot_file_name(account_id: u64, slot: u8) -> String {
    format!("FFXIV_{account_id:016X}_{slot:03}.{REPLAY_EXTENSION}")
}

fn is_banned(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Strip characters that are not allowed in file names.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|&c| !is_banned(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Stem for an auto-renamed recording: title plus wall-clock finish time.
pub fn auto_rename_stem(title: &str, finished_at: NaiveDateTime) -> String {
    let stamp = finished_at.format("%Y.%m.%d %H.%M.%S");
    format!("{} {stamp}", sanitize_file_name(title))
        .trim()
        .to_string()
}

pub fn is_replay_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(REPLAY_EXTENSION))
}

/// `name`, or the first ` (n)` variant of it (suffix before the extension)
/// that `is_taken` reports free.
pub fn unique_name(name: &str, mut is_taken: impl FnMut(&str) -> bool) -> String {
    if !is_taken(name) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (2..)
        .map(|n| match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_default()
}

/// A path in `dir` for `{stem}.dat` that does not exist yet.
pub fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let name = unique_name(&format!("{stem}.{REPLAY_EXTENSION}"), |candidate| {
        dir.join(candidate).exists()
    });
    dir.join(name)
}

/// A name not already in `taken`, which is updated to include it.
pub fn claim_name(taken: &mut HashSet<String>, name: &str) -> String {
    let name = unique_name(name, |candidate| taken.contains(candidate));
    taken.insert(name.clone());
    name
}
