//! Run command - plan, fetch, archive, bundle and deliver.

use std::path::PathBuf;
use std::sync::Arc;
use tilesweep::pacing::CooldownPacer;
use tilesweep::pipeline::{Delivery, Pipeline, PipelineConfig, RunSummary};
use tilesweep::provider::AsyncReqwestClient;
use tilesweep::region::Polygon;
use tilesweep::transport::{redact_endpoint, EndpointTransporter};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::common::{load_boundaries, resolve_pipeline_config, PipelineArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
pub struct RunArgs {
    pub boundaries: PathBuf,
    pub pipeline: PipelineArgs,
    pub endpoint: Option<String>,
    pub run_id: Option<String>,
    pub no_transport: bool,
}

/// Run the pipeline. Returns the process exit code.
pub fn run(args: RunArgs, runner: &CliRunner) -> Result<i32, CliError> {
    runner.log_startup("run");
    let config = runner.config();

    let mut pipeline_config = resolve_pipeline_config(&args.pipeline, config)?;
    if let Some(run_id) = &args.run_id {
        pipeline_config = pipeline_config.with_run_id(run_id);
        pipeline_config
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
    }

    let endpoint = if args.no_transport {
        None
    } else {
        args.endpoint.or_else(|| config.transport.endpoint.clone())
    };
    let transporter = endpoint
        .as_deref()
        .map(|e| {
            EndpointTransporter::from_endpoint(
                e,
                &config.transport.user_env,
                &config.transport.password_env,
            )
        })
        .transpose()
        .map_err(CliError::Transport)?;

    let polygons = load_boundaries(&args.boundaries)?;

    println!("Boundaries: {} polygon(s) from {}", polygons.len(), args.boundaries.display());
    println!("Tiles:      {}", pipeline_config.tiles_dir().display());
    println!("Zoom:       {}", pipeline_config.zooms());
    println!("Source:     {}", pipeline_config.source().label());
    println!("Run id:     {}", pipeline_config.run_id());
    match &endpoint {
        Some(e) => println!("Transport:  {}", redact_endpoint(e)),
        None => println!("Transport:  disabled"),
    }
    println!();

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    let summary = runtime.block_on(execute(pipeline_config, polygons, transporter))?;

    print_summary(&summary);
    Ok(summary.exit_code())
}

async fn execute(
    config: PipelineConfig,
    polygons: Vec<Polygon>,
    transporter: Option<EndpointTransporter>,
) -> Result<RunSummary, CliError> {
    let client = Arc::new(
        AsyncReqwestClient::with_timeouts(config.fetch_timeout(), config.connect_timeout())
            .map_err(CliError::Client)?,
    );
    let pacer = CooldownPacer::new(config.cooldown());
    let pipeline = Pipeline::new(config, client, pacer)?;

    let cancellation_token = CancellationToken::new();
    spawn_interrupt_handler(cancellation_token.clone());

    let summary = match transporter {
        Some(transporter) => {
            pipeline
                .with_transporter(transporter)
                .run(&polygons, cancellation_token)
                .await?
        }
        None => pipeline.run(&polygons, cancellation_token).await?,
    };
    Ok(summary)
}

/// Cancels the run on Ctrl-C. In-flight fetches get the drain timeout to
/// finish; unfinished regions are resumed by the next run.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            eprintln!();
            eprintln!("Interrupted: finishing in-flight tiles, then stopping...");
            token.cancel();
        }
    });
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Regions");
    println!("=======");
    for report in &summary.regions {
        let mut line = format!(
            "  {:<9} {}  {}/{} tiles",
            report.status().as_str(),
            report.region.id,
            report.tiles_fetched(),
            report.tiles_requested()
        );
        if !report.failures_by_kind.is_empty() {
            let kinds: Vec<String> = report
                .failures_by_kind
                .iter()
                .map(|(kind, count)| format!("{} {}", count, kind))
                .collect();
            line.push_str(&format!("  (failed: {})", kinds.join(", ")));
        }
        println!("{}", line);
        if let Some(error) = &report.error {
            println!("            error: {}", error);
        }
    }

    println!();
    println!(
        "Archived {}, skipped {}, unresolved {}",
        summary.archived_count(),
        summary.skipped_count(),
        summary.unresolved_count()
    );
    println!("{}", summary.stats);

    if let Some(bundle) = &summary.bundle {
        let state = if bundle.reused { "unchanged" } else { "written" };
        println!(
            "Bundle {}: {} ({} archives)",
            state,
            bundle.path.display(),
            bundle.archives.len()
        );
    }
    if let Some(error) = &summary.bundle_error {
        println!("Bundle failed: {}", error);
    }
    match &summary.delivery {
        Delivery::Delivered { destination } => println!("Delivered to {}", destination),
        Delivery::Failed(e) => println!("Delivery failed: {}", e),
        Delivery::Disabled | Delivery::NotReached => {}
    }
    if summary.cancelled {
        println!("Run cancelled; re-run to resume.");
    }

    info!(
        exit_code = summary.exit_code(),
        elapsed_secs = summary.elapsed.as_secs(),
        "Run finished"
    );
}
