//! Player configuration
//!
//! YAML-backed settings for widget geometry, waveform styling and the frame
//! timer. Missing or malformed files fall back to defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use iced::{Point, Rectangle, Size};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub layout: LayoutConfig,
    pub waveform: WaveformConfig,
    /// Frame timer period while playing, in milliseconds.
    pub frame_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            waveform: WaveformConfig::default(),
            frame_interval_ms: 16,
        }
    }
}

/// Player geometry. Everything else is derived from these three values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 50.0,
            margin: 7.0,
        }
    }
}

impl LayoutConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Side of the square play/stop button.
    pub fn icon_size(&self) -> f32 {
        (self.height - self.margin * 2.0).max(0.0)
    }

    pub fn button_rect(&self) -> Rectangle {
        Rectangle::new(
            Point::new(self.margin, self.margin),
            Size::new(self.icon_size(), self.icon_size()),
        )
    }

    /// Area the waveform occupies, right of the button.
    pub fn waveform_rect(&self) -> Rectangle {
        let icon = self.icon_size();
        Rectangle::new(
            Point::new(self.margin * 2.0 + icon, self.margin),
            Size::new(
                (self.width - (self.margin * 3.0 + icon)).max(0.0),
                icon,
            ),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Draw every n-th envelope column.
    pub column_stride: usize,
    pub stroke_width: f32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            column_stride: 3,
            stroke_width: 2.15,
        }
    }
}

/// Default config location: `<config dir>/sample-player/config.yaml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sample-player")
        .join("config.yaml")
}

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns default config.
/// If the file exists but is invalid, logs a warning and returns default config.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("load_config: {:?} doesn't exist, using defaults", path);
        return T::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<T>(&contents) {
            Ok(config) => {
                log::info!("load_config: loaded {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("load_config: failed to parse config: {}, using defaults", e);
                T::default()
            }
        },
        Err(e) => {
            log::warn!("load_config: failed to read config file: {}, using defaults", e);
            T::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories.
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: wrote {:?}", path);
    Ok(())
}
