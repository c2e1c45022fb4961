//! Default values and constants for all configuration settings.
//!
//! Contains the `DEFAULT_*` constants that have no home in a library
//! module and the `ConfigFile::default()` implementation.

use std::path::PathBuf;

use super::settings::*;
use crate::fetch::{DEFAULT_DRAIN_TIMEOUT, DEFAULT_FETCH_TIMEOUT};
use crate::pacing::DEFAULT_COOLDOWN;
use crate::pipeline::{DEFAULT_CONCURRENCY, DEFAULT_TILES_DIR, DEFAULT_TILE_EXTENSION};
use crate::provider::{SourcePreset, DEFAULT_CONNECT_TIMEOUT};
use crate::region::ZoomRange;
use crate::transport::{DEFAULT_PASSWORD_ENV, DEFAULT_USER_ENV};

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE: &str = "tilesweep.log";

/// Default log file path (~/.tilesweep/tilesweep.log).
pub fn default_log_file() -> PathBuf {
    super::file::config_directory().join(DEFAULT_LOG_FILE)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            tiles: TilesSettings {
                directory: PathBuf::from(DEFAULT_TILES_DIR),
                extension: DEFAULT_TILE_EXTENSION.to_string(),
            },
            source: SourceSettings {
                preset: SourcePreset::GoogleHybrid,
                url_template: None,
                layer: None,
            },
            fetch: FetchSettings {
                concurrency: DEFAULT_CONCURRENCY,
                timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            },
            pipeline: PipelineSettings {
                zooms: ZoomRange::default(),
                cooldown_secs: DEFAULT_COOLDOWN.as_secs(),
                drain_timeout_secs: DEFAULT_DRAIN_TIMEOUT.as_secs(),
            },
            transport: TransportSettings {
                endpoint: None,
                user_env: DEFAULT_USER_ENV.to_string(),
                password_env: DEFAULT_PASSWORD_ENV.to_string(),
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
