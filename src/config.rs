//! User settings
//!
//! Settings live in `<config_dir>/zypsel/settings.json`. A missing file means
//! defaults; a malformed one is an error so typos don't silently reset things.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSettings {
    pub installed_version: bool,
    pub candidate_version: bool,
    pub summary: bool,
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self {
            installed_version: true,
            candidate_version: true,
            summary: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub columns: ColumnSettings,
    pub sort_ascending: bool,
    /// strftime format for the history date rows
    pub history_date_format: String,
    /// Package snapshot loaded when no path is given on the command line
    pub snapshot_path: PathBuf,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let dirs = project_dirs();
        Self {
            columns: ColumnSettings::default(),
            sort_ascending: true,
            history_date_format: String::from("%-d %B %Y"),
            snapshot_path: dirs
                .as_ref()
                .map(|d| d.data_dir().join("snapshot.json"))
                .unwrap_or_else(|| PathBuf::from("snapshot.json")),
            log_file: dirs
                .as_ref()
                .map(|d| d.cache_dir().join("zypsel.log"))
                .unwrap_or_else(|| std::env::temp_dir().join("zypsel.log")),
        }
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self, ConfigError> {
        match project_dirs() {
            Some(dirs) => Self::load_from(&dirs.config_dir().join(SETTINGS_FILE)),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "zypsel", "zypsel")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "history_date_format": "%Y-%m-%d", "columns": { "summary": false } }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.history_date_format, "%Y-%m-%d");
        assert!(!settings.columns.summary);
        assert!(settings.columns.installed_version);
        assert!(settings.sort_ascending);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Parse { .. })));
    }
}
