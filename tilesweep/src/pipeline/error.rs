//! Pipeline errors.
//!
//! [`PipelineError`] stops a run before any region is fetched. Failures
//! during the run are recorded per region ([`RegionError`]) or in the run
//! summary, and never abort the remaining regions.

use crate::archive::ArchiveError;
use crate::coord::CoordError;
use crate::fetch::FetchFailure;
use crate::region::PlanError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a run from starting.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no polygons to process")]
    NoRegions,

    /// A polygon cannot be planned (e.g. outside the Mercator latitude range)
    #[error("polygon {index} cannot be planned: {source}")]
    Plan {
        index: usize,
        #[source]
        source: PlanError,
    },

    /// The tiles root could not be scanned for existing archives
    #[error("cannot scan {} for archives: {source}", .path.display())]
    Index {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why a region did not reach a terminal status.
#[derive(Debug, Error)]
pub enum RegionError {
    /// A tile could not be written; the region was abandoned
    #[error("filesystem failure: {0}")]
    Filesystem(FetchFailure),

    /// The stale raw directory could not be cleared
    #[error("cannot clear {}: {source}", .path.display())]
    Clear {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("tile planning failed: {0}")]
    Projection(#[from] CoordError),

    #[error("archive failed: {0}")]
    Archive(#[from] ArchiveError),

    /// Run cancellation interrupted the region
    #[error("cancelled")]
    Cancelled,
}
