//! User Settings
//!
//! Read-only snapshot for the core, plus a JSON-file store the core forwards writes to.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::backlinks::{BoundaryStrategy, SortConfig};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config directory not found")]
    NoConfigDir,
}

impl Serialize for SettingsError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// How the header above each block is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeaderStyle {
    /// Source path without extension
    #[default]
    Default,
    /// Source title only
    Minimal,
    /// No header
    Hidden,
}

impl HeaderStyle {
    pub fn from_config(name: &str) -> Self {
        match name {
            "Minimal" => HeaderStyle::Minimal,
            "Hidden" => HeaderStyle::Hidden,
            _ => HeaderStyle::Default,
        }
    }
}

/// Visual theme hint passed through to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Default,
    Compact,
    Card,
}

impl Theme {
    pub fn from_config(name: &str) -> Self {
        match name {
            "Compact" => Theme::Compact,
            "Card" => Theme::Card,
            _ => Theme::Default,
        }
    }
}

/// Persisted preferences. String-valued options are kept as written and
/// resolved with a fallback when read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub block_boundary_strategy: String,
    pub sort_descending: bool,
    pub sort_by_full_path: bool,
    pub blocks_collapsed: bool,
    pub header_style: String,
    pub hide_backlink_line: bool,
    pub hide_first_header: bool,
    pub theme: String,
    pub only_daily_notes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            block_boundary_strategy: "Default".to_string(),
            sort_descending: false,
            sort_by_full_path: false,
            blocks_collapsed: false,
            header_style: "Default".to_string(),
            hide_backlink_line: false,
            hide_first_header: false,
            theme: "Default".to_string(),
            only_daily_notes: false,
        }
    }
}

impl Settings {
    pub fn boundary_strategy(&self) -> BoundaryStrategy {
        BoundaryStrategy::from_config(&self.block_boundary_strategy)
    }

    pub fn header_style(&self) -> HeaderStyle {
        HeaderStyle::from_config(&self.header_style)
    }

    pub fn theme(&self) -> Theme {
        Theme::from_config(&self.theme)
    }

    pub fn sort_config(&self) -> SortConfig {
        SortConfig {
            descending: self.sort_descending,
            by_full_path: self.sort_by_full_path,
        }
    }
}

/// External persistence for settings
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Settings kept in a JSON file
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/backlink-blocks/settings.json`
    pub fn default_location() -> Result<Self, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dir.join("backlink-blocks").join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Settings, SettingsError> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl SettingsStore for JsonSettingsStore {
    /// Missing file means defaults; a broken one is logged and also means defaults.
    fn load(&self) -> Settings {
        if !self.path.exists() {
            return Settings::default();
        }
        match self.read() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to load settings, using defaults"
                );
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Store that keeps settings in memory only
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self { settings: Mutex::new(settings) }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Settings {
        self.settings.lock().clone()
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        *self.settings.lock() = settings.clone();
        Ok(())
    }
}
