//! Persisted audio and spectrogram settings.
//!
//! The store is a versioned JSON document. Older documents are migrated on
//! load: defaults that have since changed are replaced, and missing fields
//! are filled from the current defaults.

use crate::settings::{AudioSettings, Colormap, SpectrogramSettings};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const STORE_VERSION: u32 = 1;

/// Colormap default before version 1.
const LEGACY_CMAP: &str = "gray";
/// Window size default (seconds) before version 1.
const LEGACY_WINDOW_SIZE: f64 = 0.025;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsStore {
    pub version: u32,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub spectrogram: SpectrogramSettings,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            audio: AudioSettings::default(),
            spectrogram: SpectrogramSettings::default(),
        }
    }
}

impl SettingsStore {
    pub fn new(audio: AudioSettings, spectrogram: SpectrogramSettings) -> Self {
        Self {
            version: STORE_VERSION,
            audio,
            spectrogram,
        }
    }

    /// `$XDG_CONFIG_HOME/whombat-viewer/settings.json`
    pub fn default_path() -> PathBuf {
        crate::config::AppConfig::default_path().with_file_name("settings.json")
    }

    /// Parse a stored document, migrating it to the current version.
    fn from_json(json: &str) -> anyhow::Result<Self> {
        let mut value: Value = serde_json::from_str(json).context("Settings store is not valid JSON")?;
        let version = value
            .get("version")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if version < u64::from(STORE_VERSION) {
            migrate_v0(&mut value);
        }
        if let Some(root) = value.as_object_mut() {
            root.insert("version".into(), Value::from(STORE_VERSION));
        }
        serde_json::from_value(value).context("Settings store has an unexpected layout")
    }

    fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let store = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), "Settings loaded");
        Ok(store)
    }

    /// Missing files give the defaults; unreadable ones are logged and
    /// replaced by the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load_from_file(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "Using default settings");
            Self::default()
        })
    }
}

/// Replace stale defaults from stores written before version 1.
fn migrate_v0(value: &mut Value) {
    let Some(root) = value.as_object_mut() else {
        return;
    };
    let spectrogram = root
        .entry("spectrogram")
        .or_insert_with(|| Value::Object(Default::default()));
    let Some(spectrogram) = spectrogram.as_object_mut() else {
        return;
    };

    let defaults = SpectrogramSettings::default();
    let stale_cmap = spectrogram
        .get("cmap")
        .and_then(Value::as_str)
        .map_or(true, |cmap| cmap == LEGACY_CMAP);
    if stale_cmap {
        spectrogram.insert("cmap".into(), Value::from(Colormap::default().as_str()));
    }

    let stale_window = spectrogram
        .get("window_size")
        .and_then(Value::as_f64)
        .map_or(true, |size| (size - LEGACY_WINDOW_SIZE).abs() < f64::EPSILON);
    if stale_window {
        spectrogram.insert("window_size".into(), Value::from(defaults.window_size));
    }
    tracing::debug!(stale_cmap, stale_window, "Migrated settings store to version 1");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Scale;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut original = SettingsStore::default();
        original.audio.speed = 0.5;
        original.spectrogram.cmap = Colormap::Gray;
        original.save_to_file(&path).unwrap();

        let loaded = SettingsStore::load_from_file(&path).unwrap();
        assert_eq!(loaded, original, "current-version gray is a user choice");
    }

    #[test]
    fn test_migrates_legacy_defaults() {
        let json = r#"{
            "audio": {"speed": 2.0},
            "spectrogram": {"cmap": "gray", "window_size": 0.025, "scale": "amplitude"}
        }"#;
        let store = SettingsStore::from_json(json).unwrap();
        assert_eq!(store.version, STORE_VERSION);
        assert_eq!(store.spectrogram.cmap, Colormap::default());
        assert_eq!(store.spectrogram.window_size, SpectrogramSettings::default().window_size);
        assert_eq!(store.spectrogram.scale, Scale::Amplitude);
        assert_eq!(store.audio.speed, 2.0);
        assert_eq!(store.audio.filter_order, AudioSettings::default().filter_order);
    }

    #[test]
    fn test_legacy_custom_values_survive() {
        let json = r#"{"version": 0, "spectrogram": {"cmap": "magma", "window_size": 0.1}}"#;
        let store = SettingsStore::from_json(json).unwrap();
        assert_eq!(store.spectrogram.cmap, Colormap::Magma);
        assert_eq!(store.spectrogram.window_size, 0.1);
    }

    #[test]
    fn test_missing_sections_default() {
        let store = SettingsStore::from_json("{}").unwrap();
        assert_eq!(store, SettingsStore::default());
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(SettingsStore::load_from_file(&path).is_err());
        assert_eq!(SettingsStore::load_or_default(&path), SettingsStore::default());
    }
}
