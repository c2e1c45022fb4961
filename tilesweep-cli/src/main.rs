//! tilesweep CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tilesweep library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tilesweep::logging::LoggingOptions;

use commands::common::PipelineArgs;
use commands::config::ConfigCommands;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "tilesweep")]
#[command(version = tilesweep::VERSION)]
#[command(about = "Fetch and archive map tiles covering boundary polygons", long_about = None)]
struct Cli {
    /// Config file (default: ~/.tilesweep/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Do not mirror log output to stdout
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, archive, bundle and deliver every region
    Run {
        /// Directory with .kml boundary files
        boundaries: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Bundle destination (upload URL or directory), overrides the config file
        #[arg(long)]
        endpoint: Option<String>,

        /// Bundle name (default: local timestamp)
        #[arg(long)]
        run_id: Option<String>,

        /// Stop after writing the bundle
        #[arg(long, conflicts_with = "endpoint")]
        no_transport: bool,
    },

    /// Show regions and tile counts without fetching
    Plan {
        /// Directory with .kml boundary files
        boundaries: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(code) => process::exit(code),
        Err(e) => e.exit(),
    }
}

fn dispatch(cli: Cli) -> Result<i32, CliError> {
    let options = LoggingOptions {
        debug: cli.debug,
        stdout: !cli.quiet,
    };
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            boundaries,
            pipeline,
            endpoint,
            run_id,
            no_transport,
        } => {
            let runner = CliRunner::new(config_path, options)?;
            commands::run::run(
                commands::run::RunArgs {
                    boundaries,
                    pipeline,
                    endpoint,
                    run_id,
                    no_transport,
                },
                &runner,
            )
        }
        Commands::Plan {
            boundaries,
            pipeline,
        } => {
            let runner = CliRunner::new(config_path, LoggingOptions { stdout: false, ..options })?;
            commands::plan::run(
                commands::plan::PlanArgs {
                    boundaries,
                    pipeline,
                },
                &runner,
            )
        }
        Commands::Config(command) => commands::config::run(command, config_path),
    }
}
