//! Path management for chorus configuration files.
//!
//! ```text
//! ~/.config/chorus/            # Config directory (platform config dir)
//! └── config.toml              # Application configuration
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "chorus";
const CONFIG_FILE: &str = "config.toml";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Path resolution for chorus.
pub struct ChorusPaths;

impl ChorusPaths {
    /// Returns the chorus configuration directory (e.g. `~/.config/chorus/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path of `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_app_dir() {
        if let Ok(path) = ChorusPaths::config_file() {
            assert!(path.ends_with("chorus/config.toml"));
        }
    }
}
