//! Configuration for sketch hosts.
//!
//! Everything has a sensible default, so an empty JSON object is a valid
//! config file. Load with `load_config`, then call `validate()`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sketch_core::StrokeStyle;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::storage::{validate_key, FileStore, StorageError, DEFAULT_STORAGE_KEY};

/// Drawing surface size and fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// RGBA, 0-255. Opaque white keeps JPEG exports readable.
    pub background: [u8; 4],
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: [255, 255, 255, 255],
        }
    }
}

/// Where the drawing is persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            key: DEFAULT_STORAGE_KEY.into(),
        }
    }
}

impl StorageConfig {
    pub fn file_store(&self) -> FileStore {
        FileStore::new(&self.dir)
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("sketch"))
        .unwrap_or_else(|| PathBuf::from("sketch-data"))
}

/// Export destination and encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    /// 1-100.
    pub jpeg_quality: u8,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            jpeg_quality: 92,
        }
    }
}

/// Top-level config. Save/load this as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    pub canvas: CanvasConfig,
    pub stroke: StrokeStyle,
    pub storage: StorageConfig,
    pub export: ExportSettings,
}

impl SketchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            tracing::error!(
                width = self.canvas.width,
                height = self.canvas.height,
                "canvas dimensions must be non-zero"
            );
            return Err(ConfigError::InvalidCanvasSize {
                width: self.canvas.width,
                height: self.canvas.height,
            });
        }

        if let Err(e) = self.stroke.validate() {
            tracing::error!(width = self.stroke.width, "invalid stroke width");
            return Err(ConfigError::InvalidStroke(e));
        }

        if let Err(e) = validate_key(&self.storage.key) {
            tracing::error!(key = %self.storage.key, "invalid storage key");
            return Err(ConfigError::InvalidStorageKey(e));
        }

        if !(1..=100).contains(&self.export.jpeg_quality) {
            tracing::error!(
                jpeg_quality = self.export.jpeg_quality,
                "jpeg quality out of range [1, 100]"
            );
            return Err(ConfigError::InvalidJpegQuality {
                quality: self.export.jpeg_quality,
            });
        }

        Ok(())
    }
}

/// Config validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid canvas size {width}x{height} (both must be > 0)")]
    InvalidCanvasSize { width: u32, height: u32 },

    #[error("invalid stroke: {0}")]
    InvalidStroke(#[from] sketch_core::StyleError),

    #[error("invalid storage key: {0}")]
    InvalidStorageKey(#[from] StorageError),

    #[error("invalid jpeg quality {quality} (must be in [1, 100])")]
    InvalidJpegQuality { quality: u8 },
}

/// Save a config to disk as pretty JSON.
pub fn save_config(path: impl AsRef<Path>, config: &SketchConfig) -> anyhow::Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create parent dir: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(config).context("serialize config to json")?;
    fs::write(path, json).with_context(|| format!("write config file: {}", path.display()))?;
    Ok(())
}

/// Load and validate a config from disk.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<SketchConfig> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config file: {}", path.display()))?;
    let config: SketchConfig = serde_json::from_str(&data).context("parse config json")?;
    config
        .validate()
        .with_context(|| format!("validate config file: {}", path.display()))?;
    Ok(config)
}
