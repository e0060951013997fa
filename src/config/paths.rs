//! Where the scanner keeps its settings, resolved with the `dirs` crate.
//!
//! ```text
//! Windows: %APPDATA%\ingredient-scanner\settings.toml
//! macOS:   ~/Library/Application Support/ingredient-scanner/settings.toml
//! Linux:   ~/.config/ingredient-scanner/settings.toml
//! ```

use std::path::{Path, PathBuf};

const APP_DIR: &str = "ingredient-scanner";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// `<platform config dir>/ingredient-scanner`.
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    /// Platform locations.  Falls back to `./ingredient-scanner` when the
    /// platform has no config directory.
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::under(&base)
    }

    /// Layout rooted at `base` instead of the platform config directory.
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
