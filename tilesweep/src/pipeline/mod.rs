//! Pipeline driver.
//!
//! [`Pipeline::run`] sequences regions one at a time, pausing between
//! regions that fetch, and finishes with bundling and transport.

mod config;
mod driver;
mod error;
mod summary;

pub use config::{
    default_run_id, PipelineConfig, DEFAULT_CONCURRENCY, DEFAULT_TILES_DIR,
    DEFAULT_TILE_EXTENSION,
};
pub use driver::Pipeline;
pub use error::{PipelineError, RegionError};
pub use summary::{Delivery, RegionReport, RunSummary, ZoomReport};
