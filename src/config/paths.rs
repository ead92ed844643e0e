//! Platform paths resolved with the `dirs` crate.
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\vf-dataset\
//!   macOS:   ~/Library/Application Support/vf-dataset/
//!   Linux:   ~/.config/vf-dataset/
//!
//! Cache dir (segment and feature artifacts):
//!   Windows: %LOCALAPPDATA%\vf-dataset\
//!   macOS:   ~/Library/Caches/vf-dataset/
//!   Linux:   ~/.cache/vf-dataset/
//!
//! Database root (PhysioNet records): `~/database`

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    pub cache_dir: PathBuf,
    /// Directory holding one sub-directory per database.
    pub database_root: PathBuf,
}

impl DataPaths {
    const APP_NAME: &'static str = "vf-dataset";

    /// Resolves all paths, falling back to the current directory where the
    /// platform has no standard location.
    pub fn new() -> Self {
        let fallback = || PathBuf::from(".");
        let config_dir = dirs::config_dir()
            .unwrap_or_else(fallback)
            .join(Self::APP_NAME);
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(fallback)
            .join(Self::APP_NAME);
        let database_root = dirs::home_dir().unwrap_or_else(fallback).join("database");

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            cache_dir,
            database_root,
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = DataPaths::new();
        assert!(paths.config_dir.ends_with("vf-dataset"));
        assert!(paths.cache_dir.ends_with("vf-dataset"));
        assert!(paths.database_root.ends_with("database"));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
    }
}
