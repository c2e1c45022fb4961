//! User configuration stored in `~/.tilesweep/config.ini`.
//!
//! The file is optional. Missing keys fall back to the library defaults and
//! invalid values are reported with their section and key. Command line
//! flags are layered on top by the CLI.

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{default_log_file, DEFAULT_LOG_FILE};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, FetchSettings, LoggingSettings, PipelineSettings, SourceSettings, TilesSettings,
    TransportSettings,
};
