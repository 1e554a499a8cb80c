//! Recorder configuration (`config.toml` in the platform config directory)
//!
//! Missing or unparsable files fall back to defaults; every field is
//! optional in TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::RetentionLimits;

const CONFIG_FILE: &str = "config.toml";

/// User settings for the recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Finished recordings kept in `autorenamed/` (default: 30, 0 disables)
    #[serde(default = "default_max_auto_renamed")]
    pub max_auto_renamed_replays: u32,
    /// Deleted replays kept in `deleted/` (default: 10, 0 deletes outright)
    #[serde(default = "default_max_deleted")]
    pub max_deleted_replays: u32,
    /// Show the recording indicator while recording (default: true)
    #[serde(default = "default_true")]
    pub enable_recording_icon: bool,
    /// Replay directory; the platform data directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_dir: Option<PathBuf>,
    /// Most recently loaded managed replay, resumed after a reload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_loaded_replay: Option<PathBuf>,
}

fn default_max_auto_renamed() -> u32 {
    30
}
fn default_max_deleted() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_auto_renamed_replays: default_max_auto_renamed(),
            max_deleted_replays: default_max_deleted(),
            enable_recording_icon: true,
            replay_dir: None,
            last_loaded_replay: None,
        }
    }
}

impl RecorderConfig {
    pub fn retention(&self) -> RetentionLimits {
        RetentionLimits {
            max_auto_renamed: self.max_auto_renamed_replays,
            max_deleted: self.max_deleted_replays,
        }
    }

    /// The configured replay directory, or the platform default.
    pub fn resolve_replay_dir(&self) -> Option<PathBuf> {
        self.replay_dir.clone().or_else(data_dir)
    }

    /// Load from an explicit file, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Invalid config, using defaults"
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Write to an explicit file, creating its directory.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, content)
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\RealmRecorder\config`
/// On macOS: `~/Library/Application Support/io.realm-recorder.RealmRecorder`
/// On Linux: `~/.config/RealmRecorder`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.realm-recorder", "", "RealmRecorder")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Returns the platform-specific data directory, where replays live by default.
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.realm-recorder", "", "RealmRecorder")
        .map(|dirs| dirs.data_dir().join("replays"))
}

/// Loads the configuration from the platform config directory.
pub fn load() -> RecorderConfig {
    config_dir()
        .map(|dir| RecorderConfig::load_from(&dir.join(CONFIG_FILE)))
        .unwrap_or_default()
}

/// Saves the configuration to the platform config directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &RecorderConfig) -> std::io::Result<()> {
    match config_dir() {
        Some(dir) => config.save_to(&dir.join(CONFIG_FILE)),
        None => Ok(()),
    }
}
