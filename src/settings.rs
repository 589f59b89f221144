use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::persist::STORAGE_KEY;

pub const SETTINGS_FILE: &str = "settings.json";

// App settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Key of the persisted state record
    pub storage_key: String,
    /// Directory holding the state record; the app data dir when unset
    pub storage_dir: Option<String>,
    /// env_logger filter used when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            storage_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn storage_dir(&self, data_dir: &Path) -> PathBuf {
        match self.storage_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => data_dir.to_path_buf(),
        }
    }
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE)
}

// Load settings from disk
pub fn load_settings(data_dir: &Path) -> Settings {
    let path = settings_path(data_dir);

    if path.exists() {
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    } else {
        Settings::default()
    }
}

// Save settings to disk
pub fn save_settings(data_dir: &Path, settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(settings_path(data_dir), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_settings_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(dir.path());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.storage_key, "notes-storage");
        assert_eq!(settings.storage_dir(dir.path()), dir.path());
    }

    #[test]
    fn test_settings_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            storage_key: "my-notes".to_string(),
            storage_dir: Some("/var/lib/notes".to_string()),
            log_filter: "debug".to_string(),
        };
        save_settings(dir.path(), &settings).unwrap();
        assert_eq!(load_settings(dir.path()), settings);
        assert_eq!(
            settings.storage_dir(dir.path()),
            PathBuf::from("/var/lib/notes")
        );
    }

    #[test]
    fn test_partial_and_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(settings_path(dir.path()), r#"{ "logFilter": "warn" }"#).unwrap();
        let settings = load_settings(dir.path());
        assert_eq!(settings.log_filter, "warn");
        assert_eq!(settings.storage_key, "notes-storage");

        std::fs::write(settings_path(dir.path()), "garbage").unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }
}
