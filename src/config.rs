use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::capture::DEFAULT_STABLE_FRAMES;
use crate::verification::SessionScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceMode {
    Static,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Json,
    Sqlite,
}

/// Tunables for the capture core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Repeats of an identical reading required after its first sighting
    /// before the document text locks.
    pub stable_frames: u32,
    pub guidance: GuidanceMode,
    pub storage: StorageBackend,
    pub scope: SessionScope,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            stable_frames: DEFAULT_STABLE_FRAMES,
            guidance: GuidanceMode::Static,
            storage: StorageBackend::Json,
            scope: SessionScope::Global,
        }
    }
}

impl CaptureConfig {
    /// Reads `path` if it exists, then applies environment overrides.
    /// A corrupt file falls back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring invalid config {}: {err}", path.display());
                Self::default()
            })
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Applies `IDCAPTURE_STABLE_FRAMES`, `IDCAPTURE_GUIDANCE` and
    /// `IDCAPTURE_STORAGE`. Unparseable values are ignored with a warning.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("IDCAPTURE_STABLE_FRAMES") {
            match value.trim().parse::<u32>() {
                Ok(frames) => self.stable_frames = frames,
                Err(_) => warn!("Ignoring IDCAPTURE_STABLE_FRAMES={value:?}"),
            }
        }

        if let Some(value) = lookup("IDCAPTURE_GUIDANCE") {
            match value.trim().to_ascii_lowercase().as_str() {
                "static" => self.guidance = GuidanceMode::Static,
                "live" => self.guidance = GuidanceMode::Live,
                _ => warn!("Ignoring IDCAPTURE_GUIDANCE={value:?}"),
            }
        }

        if let Some(value) = lookup("IDCAPTURE_STORAGE") {
            match value.trim().to_ascii_lowercase().as_str() {
                "json" => self.storage = StorageBackend::Json,
                "sqlite" => self.storage = StorageBackend::Sqlite,
                _ => warn!("Ignoring IDCAPTURE_STORAGE={value:?}"),
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaptureConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.stable_frames, 3);
        assert_eq!(config.scope, SessionScope::Global);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"stableFrames":5,"storage":"sqlite"}"#).unwrap();

        let config = CaptureConfig::load(&path).unwrap();
        assert_eq!(config.stable_frames, 5);
        assert_eq!(config.storage, StorageBackend::Sqlite);
        assert_eq!(config.guidance, GuidanceMode::Static);
        assert_eq!(config.scope, SessionScope::Global);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"stableFrames":"#).unwrap();

        let config = CaptureConfig::load(&path).unwrap();
        assert_eq!(config, CaptureConfig::default());
    }

    #[test]
    fn account_scope_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"scope":{"account":"user-42"}}"#).unwrap();

        let config = CaptureConfig::load(&path).unwrap();
        assert_eq!(config.scope, SessionScope::Account("user-42".into()));
        assert_eq!(config.stable_frames, 3);
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = [
            ("IDCAPTURE_STABLE_FRAMES", "7"),
            ("IDCAPTURE_GUIDANCE", "LIVE"),
            ("IDCAPTURE_STORAGE", "floppy"),
        ]
        .into_iter()
        .collect();

        let config = CaptureConfig::default()
            .with_env_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.stable_frames, 7);
        assert_eq!(config.guidance, GuidanceMode::Live);
        assert_eq!(config.storage, StorageBackend::Json);
    }
}
