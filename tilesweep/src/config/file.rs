//! Configuration file handling for ~/.tilesweep/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub use super::settings::*;

use crate::pipeline::PipelineConfig;
use crate::provider::TileSource;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilesweep/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.tilesweep/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
        }
        Ok(path)
    }

    /// Imagery source selected by the `[source]` section.
    pub fn tile_source(&self) -> TileSource {
        TileSource::resolve(
            self.source.preset,
            self.source.url_template.clone(),
            self.source.layer.as_deref(),
        )
    }

    /// Pipeline configuration built from the file. The run id keeps its
    /// timestamp default.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(&self.tiles.directory)
            .with_tile_extension(&self.tiles.extension)
            .with_source(self.tile_source())
            .with_concurrency(self.fetch.concurrency)
            .with_fetch_timeout(Duration::from_secs(self.fetch.timeout_secs))
            .with_connect_timeout(Duration::from_secs(self.fetch.connect_timeout_secs))
            .with_zooms(self.pipeline.zooms)
            .with_cooldown(Duration::from_secs(self.pipeline.cooldown_secs))
            .with_drain_timeout(Duration::from_secs(self.pipeline.drain_timeout_secs))
    }
}

/// Get the path to the config directory (~/.tilesweep).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilesweep")
}

/// Get the path to the config file (~/.tilesweep/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
