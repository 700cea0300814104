use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::modeling::bevel::BevelParams;
use crate::modeling::snapshot::DEFAULT_UNDO_LIMIT;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings format: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("settings serialization: {0}")]
    Serialize(#[from] ron::Error),
}

/// Fixed policy of the interactive bevel tool
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BevelSettings {
    /// Quads across each bevel strip
    pub segments: u32,
    /// Profile shape (0.25 straight, 0.5 round, 1.0 square)
    pub profile: f32,
    /// Keep slides within half the adjacent edge length
    pub clamp_overlap: bool,
}

impl Default for BevelSettings {
    fn default() -> Self {
        Self {
            segments: 3,
            profile: 1.0,
            clamp_overlap: false,
        }
    }
}

impl BevelSettings {
    pub fn params(&self, offset: f32) -> BevelParams {
        BevelParams {
            offset,
            segments: self.segments,
            profile: self.profile,
            clamp_overlap: self.clamp_overlap,
        }
    }
}

/// Mesh session settings that persist to disk
#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionSettings {
    /// Maximum number of backups a session keeps
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,
    /// Tool offset gained per pixel of horizontal pointer travel
    #[serde(default = "default_offset_per_pixel")]
    pub offset_per_pixel: f32,
    #[serde(default)]
    pub bevel: BevelSettings,
}

fn default_undo_limit() -> usize {
    DEFAULT_UNDO_LIMIT
}

fn default_offset_per_pixel() -> f32 {
    0.01
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
            offset_per_pixel: default_offset_per_pixel(),
            bevel: BevelSettings::default(),
        }
    }
}

impl SessionSettings {
    /// Get the settings file path
    fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("bevy_mesh_session");
            p.push("settings.ron");
            p
        })
    }

    /// Load settings from disk, or return defaults if not found or unreadable
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(SettingsError::Io(_)) => Self::default(),
            Err(e) => {
                warn!("Ignoring settings at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::file_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, content)?;
        info!("Settings saved to: {:?}", path);
        Ok(())
    }
}

pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        // Load settings on startup
        let settings = SessionSettings::load();
        app.insert_resource(settings)
            .add_systems(Update, persist_changed_settings);
    }
}

/// Write settings back whenever something changes them at runtime
fn persist_changed_settings(settings: Res<SessionSettings>) {
    if settings.is_changed() && !settings.is_added() {
        if let Err(e) = settings.save() {
            error!("Failed to save settings: {}", e);
        }
    }
}
