//! Tile fetch requests

use crate::coord::TileCoord;
use std::path::PathBuf;

/// One tile to fetch: where it lives on the grid, where to get it and
/// where to put it.
///
/// The destination is derived from the region id and the coordinate
/// (see [`TilesLayout::tile_path`](crate::layout::TilesLayout::tile_path)),
/// so re-running a region targets the same files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub coord: TileCoord,
    pub url: String,
    pub destination: PathBuf,
}

impl TileRequest {
    pub fn new(coord: TileCoord, url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            coord,
            url: url.into(),
            destination: destination.into(),
        }
    }
}
