//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use clap::Subcommand;
use std::path::Path;
use tilesweep::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a commented configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<i32, CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Show => run_show(&path)?,
        ConfigCommands::Init { force } => run_init(&path, force)?,
    }
    Ok(0)
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    let source = config.tile_source();

    if !path.exists() {
        println!("(no file at {}, showing defaults)", path.display());
        println!();
    }

    println!("[tiles]");
    println!("  directory = {}", config.tiles.directory.display());
    println!("  extension = {}", config.tiles.extension);
    println!("[source]");
    println!("  label     = {}", source.label());
    println!("  template  = {}", source.template());
    println!("  layer     = {}", source.layer());
    println!("[fetch]");
    println!("  concurrency          = {}", config.fetch.concurrency);
    println!("  timeout_secs         = {}", config.fetch.timeout_secs);
    println!("  connect_timeout_secs = {}", config.fetch.connect_timeout_secs);
    println!("[pipeline]");
    println!("  zooms              = {}", config.pipeline.zooms);
    println!("  cooldown_secs      = {}", config.pipeline.cooldown_secs);
    println!("  drain_timeout_secs = {}", config.pipeline.drain_timeout_secs);
    println!("[transport]");
    println!(
        "  endpoint     = {}",
        config
            .transport
            .endpoint
            .as_deref()
            .map(tilesweep::transport::redact_endpoint)
            .unwrap_or_else(|| "(disabled)".to_string())
    );
    println!("  user_env     = {}", config.transport.user_env);
    println!("  password_env = {}", config.transport.password_env);
    println!("[logging]");
    println!("  file = {}", config.logging.file.display());
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    ConfigFile::default().save_to(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
