//! Regions and grid planning.
//!
//! A [`Polygon`] read from a boundary file becomes a [`Region`]: its bounding
//! box, a stable [`RegionId`], the zoom levels to cover and a lifecycle
//! [`RegionStatus`]. The [`GridPlanner`] turns a region into one
//! [`TileRange`] per zoom level and consults the [`ArchiveIndex`] to skip
//! regions that were archived by an earlier run.
//!
//! ```text
//! Polygon ──bbox──► Region ──per zoom──► TileRange ──► TileCoord*
//!                     │
//!                     └── ArchiveIndex hit ──► Skipped
//! ```

mod index;
mod planner;
mod polygon;
mod types;

pub use index::ArchiveIndex;
pub use planner::{plan_tiles, GridPlanner, PlanError, TileRange, TileRangeIter};
pub use polygon::{BoundingBox, Polygon, PolygonError, Vertex};
pub use types::{Region, RegionId, RegionStatus, ZoomRange, ZoomRangeError};
