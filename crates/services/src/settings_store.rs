//! The settings document, one pretty-printed JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shared::settings::Settings;
use tracing::{info, warn};

use crate::paths;

pub const SETTINGS_FILE: &str = "settings.json";

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SETTINGS_FILE),
        }
    }

    pub fn default_location() -> Self {
        Self::new(&paths::data_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Settings>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(settings))
    }

    /// Settings from disk, or defaults. The flag says whether a file was read.
    pub fn load_or_default(&self) -> (Settings, bool) {
        match self.load() {
            Ok(Some(settings)) => (settings, true),
            Ok(None) => (Settings::default(), false),
            Err(e) => {
                warn!("falling back to default settings: {:#}", e);
                (Settings::default(), false)
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)?;
        paths::write_atomic(&self.path, &json)?;
        info!("settings saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::settings::SystemPromptMode;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        assert!(store.load().unwrap().is_none());
        let (settings, loaded) = store.load_or_default();
        assert!(!loaded);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        let mut settings = Settings::default();
        settings.api_key = "sk-or-test".into();
        settings.system_prompt_mode = SystemPromptMode::Always;
        settings.selected_models = vec!["openai/gpt-4o".into()];
        store.save(&settings).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  \"apiKey\": \"sk-or-test\""));
        let (loaded, from_disk) = store.load_or_default();
        assert!(from_disk);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        fs::write(store.path(), "{ not json").unwrap();
        assert!(store.load().is_err());
        let (settings, loaded) = store.load_or_default();
        assert!(!loaded);
        assert_eq!(settings.max_tokens, 2048);
    }
}
