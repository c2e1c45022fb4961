//! Grid planning: polygon → region → per-zoom tile rectangles.

use super::index::ArchiveIndex;
use super::polygon::{BoundingBox, Polygon};
use super::types::{Region, RegionId, RegionStatus, ZoomRange};
use crate::coord::{to_tile_coords, CoordError, TileCoord, MAX_LAT, MIN_LAT};
use thiserror::Error;
use tracing::debug;

/// Errors raised while planning a region.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// The bounding box leaves the Web Mercator domain
    #[error("region cannot be projected: {0}")]
    Projection(#[from] CoordError),
}

/// Inclusive rectangle of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl TileRange {
    /// Builds a range from two corner tiles in any order.
    ///
    /// Projecting the north-west and south-east corners can invert the y
    /// ordering (y grows southward), so both axes are normalized here.
    pub fn from_corners(a: TileCoord, b: TileCoord) -> Self {
        debug_assert_eq!(a.zoom, b.zoom);
        Self {
            zoom: a.zoom,
            x_min: a.x.min(b.x),
            x_max: a.x.max(b.x),
            y_min: a.y.min(b.y),
            y_max: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> u64 {
        (self.x_max - self.x_min) as u64 + 1
    }

    pub fn height(&self) -> u64 {
        (self.y_max - self.y_min) as u64 + 1
    }

    /// Number of tiles in the rectangle; never zero.
    pub fn len(&self) -> u64 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, tile: &TileCoord) -> bool {
        tile.zoom == self.zoom
            && (self.x_min..=self.x_max).contains(&tile.x)
            && (self.y_min..=self.y_max).contains(&tile.y)
    }

    /// Iterates column by column, top to bottom within each column.
    pub fn tiles(&self) -> TileRangeIter {
        TileRangeIter {
            range: *self,
            next_x: self.x_min,
            next_y: self.y_min,
            remaining: self.len(),
        }
    }
}

/// Iterator over every tile in a [`TileRange`].
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    range: TileRange,
    next_x: u32,
    next_y: u32,
    remaining: u64,
}

impl Iterator for TileRangeIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let tile = TileCoord {
            zoom: self.range.zoom,
            x: self.next_x,
            y: self.next_y,
        };

        self.remaining -= 1;
        if self.next_y == self.range.y_max {
            self.next_y = self.range.y_min;
            self.next_x = self.next_x.saturating_add(1);
        } else {
            self.next_y += 1;
        }

        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileRangeIter {}

/// Turns polygons into regions and regions into tile rectangles.
#[derive(Debug, Clone)]
pub struct GridPlanner {
    zooms: ZoomRange,
    layer: String,
}

impl GridPlanner {
    /// Creates a planner for the given zoom range.
    ///
    /// `layer` is a short label for the imagery layer; it becomes part of the
    /// region id so archives of different layers never collide.
    pub fn new(zooms: ZoomRange, layer: impl Into<String>) -> Self {
        Self {
            zooms,
            layer: layer.into(),
        }
    }

    pub fn zooms(&self) -> ZoomRange {
        self.zooms
    }

    /// Plans the region for `polygon`.
    ///
    /// Returns a region in [`RegionStatus::Skipped`] when `index` already
    /// holds an archive for its id, otherwise [`RegionStatus::Pending`].
    pub fn plan_region(
        &self,
        polygon: &Polygon,
        index: &ArchiveIndex,
    ) -> Result<Region, PlanError> {
        let bbox = polygon.bounding_box();
        check_projectable(&bbox)?;

        let id = RegionId::derive(&bbox, self.zooms, &self.layer);
        let status = if index.contains(&id) {
            RegionStatus::Skipped
        } else {
            RegionStatus::Pending
        };

        debug!(region = %id, status = %status, "Planned region");

        Ok(Region {
            id,
            bbox,
            zooms: self.zooms,
            status,
        })
    }

    /// Tile rectangle covering `region` at `zoom`.
    pub fn plan_tiles(&self, region: &Region, zoom: u8) -> Result<TileRange, CoordError> {
        plan_tiles(&region.bbox, zoom)
    }
}

/// Projects the box's corners at `zoom` and returns the covering rectangle.
///
/// Degenerate boxes (a point, or anything smaller than a tile) still yield
/// one tile.
pub fn plan_tiles(bbox: &BoundingBox, zoom: u8) -> Result<TileRange, CoordError> {
    let (top, left) = bbox.top_left();
    let (bottom, right) = bbox.bottom_right();
    let top_left = to_tile_coords(top, left, zoom)?;
    let bottom_right = to_tile_coords(bottom, right, zoom)?;
    Ok(TileRange::from_corners(top_left, bottom_right))
}

fn check_projectable(bbox: &BoundingBox) -> Result<(), CoordError> {
    for lat in [bbox.north, bbox.south] {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
    }
    Ok(())
}
