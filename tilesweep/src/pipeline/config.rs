//! Pipeline configuration.

use super::error::PipelineError;
use crate::fetch::{DEFAULT_DRAIN_TIMEOUT, DEFAULT_FETCH_TIMEOUT};
use crate::pacing::DEFAULT_COOLDOWN;
use crate::provider::{TileSource, DEFAULT_CONNECT_TIMEOUT};
use crate::region::ZoomRange;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of concurrent tile fetches within a region.
pub const DEFAULT_CONCURRENCY: usize = 12;

/// Default tiles root, relative to the working directory.
pub const DEFAULT_TILES_DIR: &str = "tiles";

/// Default raw tile file extension.
pub const DEFAULT_TILE_EXTENSION: &str = "jpg";

/// Run id used when none is given: local time, sortable.
pub fn default_run_id() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Everything the pipeline driver needs to know, passed in at construction.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tilesweep::pipeline::PipelineConfig;
/// use tilesweep::region::ZoomRange;
///
/// let config = PipelineConfig::new("tiles")
///     .with_zooms(ZoomRange::new(1, 12).unwrap())
///     .with_concurrency(8)
///     .with_cooldown(Duration::from_secs(60))
///     .with_run_id("survey-north");
/// assert_eq!(config.concurrency(), 8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    tiles_dir: PathBuf,
    zooms: ZoomRange,
    concurrency: usize,
    fetch_timeout: Duration,
    connect_timeout: Duration,
    cooldown: Duration,
    drain_timeout: Duration,
    tile_extension: String,
    run_id: String,
    source: TileSource,
}

impl PipelineConfig {
    /// Configuration with defaults for everything but the tiles root.
    pub fn new(tiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            tiles_dir: tiles_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_tiles_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tiles_dir = dir.into();
        self
    }

    pub fn with_zooms(mut self, zooms: ZoomRange) -> Self {
        self.zooms = zooms;
        self
    }

    /// Maximum simultaneous tile fetches. Default: 12.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Deadline for one tile (connect, transfer and validation). Default: 30 s.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Deadline for establishing a connection. Default: 10 s.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Pause between regions that fetch. Default: 240 s.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Grace period for in-flight fetches after cancellation. Default: 30 s.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Extension for raw tile files, without the dot. Default: `jpg`.
    pub fn with_tile_extension(mut self, ext: impl Into<String>) -> Self {
        self.tile_extension = ext.into();
        self
    }

    /// Names the bundle `<run id>.tar.gz`. Default: current local time.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_source(mut self, source: TileSource) -> Self {
        self.source = source;
        self
    }

    pub fn tiles_dir(&self) -> &Path {
        &self.tiles_dir
    }

    pub fn zooms(&self) -> ZoomRange {
        self.zooms
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn tile_extension(&self) -> &str {
        &self.tile_extension
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn source(&self) -> &TileSource {
        &self.source
    }

    /// Checks values the types alone do not constrain.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.concurrency == 0 {
            return Err(PipelineError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(PipelineError::Config(
                "fetch timeout must be greater than zero".to_string(),
            ));
        }
        let run_id_ok = !self.run_id.is_empty()
            && self
                .run_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !run_id_ok {
            return Err(PipelineError::Config(format!(
                "run id '{}' must be non-empty and use only letters, digits, '-', '_' or '.'",
                self.run_id
            )));
        }
        if self.tile_extension.trim_start_matches('.').is_empty() {
            return Err(PipelineError::Config(
                "tile extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tiles_dir: PathBuf::from(DEFAULT_TILES_DIR),
            zooms: ZoomRange::default(),
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            cooldown: DEFAULT_COOLDOWN,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            tile_extension: DEFAULT_TILE_EXTENSION.to_string(),
            run_id: default_run_id(),
            source: TileSource::default(),
        }
    }
}
