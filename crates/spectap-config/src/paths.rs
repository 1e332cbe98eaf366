//! Platform-specific configuration paths.
//!
//! - **User config**: `~/.config/spectap/` (Linux), `~/Library/Application Support/spectap/` (macOS), `%APPDATA%\spectap\` (Windows)
//! - **Settings file**: `spectap.toml` inside the user config directory

use std::path::{Path, PathBuf};

use crate::{ConfigError, Settings};

/// Application name used for directory paths.
const APP_NAME: &str = "spectap";

/// File name of the settings file.
const CONFIG_FILE: &str = "spectap.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the default settings file path.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Loads settings for a run.
///
/// An explicit `path` must exist. Without one, the default settings file is
/// used when present, and built-in defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => Settings::load(path),
        None => load_from_dir(&user_config_dir()),
    }
}

fn load_from_dir(dir: &Path) -> Result<Settings, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if path.is_file() {
        Settings::load(&path)
    } else {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        Ok(Settings::default())
    }
}
