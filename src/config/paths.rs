//! Where doc-narrator keeps its settings file.
//!
//! The per-user configuration directory comes from [`dirs::config_dir`]
//! (`~/.config` on Linux, `~/Library/Application Support` on macOS,
//! `%APPDATA%` on Windows); settings live in a `doc-narrator` folder below it.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "doc-narrator";
const SETTINGS_FILE: &str = "settings.toml";

/// Resolved settings location.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    /// Paths for the current user, or under the working directory when the
    /// platform has no configuration directory.
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::under(&base)
    }

    /// Paths rooted at `base` instead of the platform directory.
    pub fn under(base: &Path) -> Self {
        let config_dir = base.join(APP_DIR);
        Self {
            settings_file: config_dir.join(SETTINGS_FILE),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
