//! Overlay window placement persisted between sessions.
//!
//! Stored as JSON in the user's config directory
//! (e.g., `~/.config/ai-glance/overlay.json` on Linux).

use crate::error::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SIZE: [f32; 2] = [520.0, 400.0];
pub const MIN_SIZE: [f32; 2] = [420.0, 80.0];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlaySettings {
    /// Outer top-left corner in global points; `None` lets the platform choose.
    #[serde(default)]
    pub position: Option<[f32; 2]>,
    #[serde(default = "default_size")]
    pub size: [f32; 2],
}

fn default_size() -> [f32; 2] {
    DEFAULT_SIZE
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            position: None,
            size: DEFAULT_SIZE,
        }
    }
}

impl OverlaySettings {
    /// Returns the path to the settings file, creating its directory.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ai-glance").map(|dirs| {
            let config_dir = dirs.config_dir();
            if !config_dir.exists() {
                let _ = fs::create_dir_all(config_dir);
            }
            config_dir.join("overlay.json")
        })
    }

    /// Loads settings from disk, falling back to defaults if missing or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<Self>(&content).ok())
            .map(Self::sanitized)
            .unwrap_or_default()
    }

    /// Persists settings to disk.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save(&self) -> Result<()> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if !self.size.iter().all(|v| v.is_finite()) {
            self.size = DEFAULT_SIZE;
        }
        self.size[0] = self.size[0].max(MIN_SIZE[0]);
        self.size[1] = self.size[1].max(MIN_SIZE[1]);
        if self.position.is_some_and(|p| !p.iter().all(|v| v.is_finite())) {
            self.position = None;
        }
        self
    }
}
