//! Plan command - show what a run would fetch without fetching it.

use std::path::PathBuf;
use tilesweep::layout::TilesLayout;
use tilesweep::region::{ArchiveIndex, GridPlanner, RegionStatus};

use super::common::{load_boundaries, resolve_pipeline_config, PipelineArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the plan command.
pub struct PlanArgs {
    pub boundaries: PathBuf,
    pub pipeline: PipelineArgs,
}

/// Print every region with its status and tile counts.
pub fn run(args: PlanArgs, runner: &CliRunner) -> Result<i32, CliError> {
    runner.log_startup("plan");
    let config = resolve_pipeline_config(&args.pipeline, runner.config())?;
    let polygons = load_boundaries(&args.boundaries)?;

    let layout = TilesLayout::new(config.tiles_dir(), config.tile_extension());
    let mut index = ArchiveIndex::scan(&layout)
        .map_err(|e| CliError::Config(format!("cannot scan {}: {}", layout.root().display(), e)))?;
    let planner = GridPlanner::new(config.zooms(), config.source().label());

    let mut total_to_fetch = 0u64;
    let mut to_fetch = 0usize;
    for (n, polygon) in polygons.iter().enumerate() {
        let mut region = planner
            .plan_region(polygon, &index)
            .map_err(|e| CliError::Config(format!("polygon {}: {}", n, e)))?;
        if region.status == RegionStatus::Pending && index.contains(&region.id) {
            region.status = RegionStatus::Skipped;
        }

        println!("{}  [{}]", region.id, region.status);
        if region.status == RegionStatus::Skipped {
            continue;
        }

        let mut region_total = 0u64;
        for zoom in config.zooms().iter() {
            let range = planner
                .plan_tiles(&region, zoom)
                .map_err(|e| CliError::Config(format!("{}: {}", region.id, e)))?;
            println!("  zoom {:>2}: {:>10} tiles", zoom, range.len());
            region_total += range.len();
        }
        println!("  total:   {:>10} tiles", region_total);

        total_to_fetch += region_total;
        to_fetch += 1;
        index.insert(region.id);
    }

    println!();
    println!(
        "{} region(s), {} to fetch, {} tiles in total",
        polygons.len(),
        to_fetch,
        total_to_fetch
    );
    Ok(0)
}
