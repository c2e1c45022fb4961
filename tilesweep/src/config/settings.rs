//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use crate::provider::{SourcePreset, UrlTemplate};
use crate::region::ZoomRange;
use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Where raw tiles and archives live
    pub tiles: TilesSettings,
    /// Which imagery source to fetch from
    pub source: SourceSettings,
    /// HTTP fetch tuning
    pub fetch: FetchSettings,
    /// Zoom range and pacing between regions
    pub pipeline: PipelineSettings,
    /// Bundle delivery
    pub transport: TransportSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Tile storage configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesSettings {
    /// Root directory for raw tiles, region archives and bundles
    pub directory: PathBuf,
    /// File extension for stored tiles
    pub extension: String,
}

/// Imagery source configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    /// Built-in source used when no template is set
    pub preset: SourcePreset,
    /// Custom URL template, overrides the preset
    pub url_template: Option<UrlTemplate>,
    /// Layer substituted for `{layer}`
    pub layer: Option<String>,
}

/// Fetch configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Maximum tile requests in flight
    pub concurrency: usize,
    /// Per-tile fetch timeout in seconds
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Zoom levels fetched for every region
    pub zooms: ZoomRange,
    /// Pause between regions that fetched tiles, in seconds
    pub cooldown_secs: u64,
    /// Grace period for in-flight fetches after cancellation, in seconds
    pub drain_timeout_secs: u64,
}

/// Transport configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportSettings {
    /// Destination for the bundle (URL or directory); None disables delivery
    pub endpoint: Option<String>,
    /// Environment variable holding the transport user
    pub user_env: String,
    /// Environment variable holding the transport password
    pub password_env: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
