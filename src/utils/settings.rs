//! Persisted user settings
//!
//! A flat JSON record. Every field has its own default, so a file written by an
//! older build (or edited by hand) only needs the fields it wants to change.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_HOURS: u32 = 2;
pub const DEFAULT_DIFF_THRESHOLD: f64 = 40.0;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_WINDOW_TITLE: &str = "World of Warcraft";
pub const DEFAULT_ANTI_IDLE_MIN_MINUTES: u32 = 10;
pub const DEFAULT_ANTI_IDLE_MAX_MINUTES: u32 = 15;
pub const DEFAULT_ANTI_IDLE_KEY: &str = "space";

/// Settings record as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub image_paths: Vec<String>,
    #[serde(alias = "fishing_hotkey")]
    pub cast_key: String,
    #[serde(alias = "bait_hotkey")]
    pub bait_key: String,
    pub duration_hours: u32,
    #[serde(alias = "difference_threshold")]
    pub diff_threshold: f64,
    pub confidence_threshold: f64,
    #[serde(alias = "game_window_title")]
    pub window_title: String,
    #[serde(alias = "afk_time_min")]
    pub anti_idle_min_minutes: u32,
    #[serde(alias = "afk_time_max")]
    pub anti_idle_max_minutes: u32,
    #[serde(alias = "afk_key")]
    pub anti_idle_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_paths: Vec::new(),
            cast_key: String::new(),
            bait_key: String::new(),
            duration_hours: DEFAULT_DURATION_HOURS,
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            anti_idle_min_minutes: DEFAULT_ANTI_IDLE_MIN_MINUTES,
            anti_idle_max_minutes: DEFAULT_ANTI_IDLE_MAX_MINUTES,
            anti_idle_key: DEFAULT_ANTI_IDLE_KEY.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`.
    ///
    /// A missing file yields the defaults silently; an unreadable or malformed
    /// one yields the defaults with a warning.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("[CONFIG] Failed to read {:?}: {}. Using defaults", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("[CONFIG] Malformed settings {:?}: {}. Using defaults", path, e);
                Self::default()
            }
        }
    }

    /// Write settings to `path`, creating parent folders as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.duration_hours, 2);
        assert_eq!(settings.diff_threshold, 40.0);
        assert_eq!(settings.confidence_threshold, 0.7);
        assert_eq!(settings.anti_idle_min_minutes, 10);
        assert_eq!(settings.anti_idle_max_minutes, 15);
        assert_eq!(settings.anti_idle_key, "space");
        assert!(settings.image_paths.is_empty());
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let settings: Settings =
            serde_json::from_str(r#"{"cast_key": "F", "duration_hours": 5}"#).unwrap();
        assert_eq!(settings.cast_key, "F");
        assert_eq!(settings.duration_hours, 5);
        assert_eq!(settings.window_title, DEFAULT_WINDOW_TITLE);
        assert_eq!(settings.confidence_threshold, 0.7);
    }

    #[test]
    fn test_legacy_keys() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "image_paths": ["bobber.png"],
                "fishing_hotkey": "F",
                "bait_hotkey": "1",
                "difference_threshold": 35,
                "game_window_title": "Azeroth",
                "afk_time_min": 3,
                "afk_time_max": 7,
                "afk_key": "w"
            }"#,
        )
        .unwrap();
        assert_eq!(settings.cast_key, "F");
        assert_eq!(settings.bait_key, "1");
        assert_eq!(settings.diff_threshold, 35.0);
        assert_eq!(settings.window_title, "Azeroth");
        assert_eq!(settings.anti_idle_min_minutes, 3);
        assert_eq!(settings.anti_idle_max_minutes, 7);
        assert_eq!(settings.anti_idle_key, "w");
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.json");
        assert_eq!(Settings::load(&path), Settings::default());

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.json");

        let mut settings = Settings::default();
        settings.image_paths = vec!["a.png".to_string(), "b.png".to_string()];
        settings.cast_key = "F".to_string();
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path), settings);
    }
}
