//! Configuration and log file locations

use std::path::PathBuf;

/// Application name used for platform directories
const APP_NAME: &str = "scenarist";

/// Configuration file looked up in the current directory first
pub const LOCAL_CONFIG_FILE: &str = "scenarist.toml";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/scenarist/`
/// - macOS: `~/Library/Application Support/scenarist/`
/// - Windows: `%APPDATA%\scenarist\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the user configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}
