//! On-disk layout of the tiles root.
//!
//! ```text
//! <root>/<region-id>/<zoom>/<x>/<y>.<ext>   raw tiles while a region is fetching
//! <root>/<region-id>.zip                    per-region archive
//! <root>/<run-id>.tar.gz                    bundle of every archive
//! ```
//!
//! Every path is a pure function of its inputs, which is what makes re-runs
//! idempotent.

use crate::coord::TileCoord;
use crate::region::RegionId;
use std::path::{Path, PathBuf};

/// Extension of per-region archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Extension of the final bundle.
pub const BUNDLE_EXTENSION: &str = "tar.gz";

/// Suffix for files still being written; never treated as complete.
pub const PARTIAL_SUFFIX: &str = "partial";

/// Path builder rooted at the tiles directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesLayout {
    root: PathBuf,
    tile_extension: String,
}

impl TilesLayout {
    pub fn new(root: impl Into<PathBuf>, tile_extension: impl Into<String>) -> Self {
        let tile_extension: String = tile_extension.into();
        Self {
            root: root.into(),
            tile_extension: tile_extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tile_extension(&self) -> &str {
        &self.tile_extension
    }

    /// Raw tile directory of a region.
    pub fn region_dir(&self, id: &RegionId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// `<root>/<id>/<zoom>/<x>/<y>.<ext>`
    pub fn tile_path(&self, id: &RegionId, tile: &TileCoord) -> PathBuf {
        self.region_dir(id)
            .join(tile.zoom.to_string())
            .join(tile.x.to_string())
            .join(format!("{}.{}", tile.y, self.tile_extension))
    }

    /// `<root>/<id>.zip`
    pub fn archive_path(&self, id: &RegionId) -> PathBuf {
        self.root
            .join(format!("{}.{}", id.as_str(), ARCHIVE_EXTENSION))
    }

    /// Where an archive is written before it is confirmed complete.
    pub fn partial_archive_path(&self, id: &RegionId) -> PathBuf {
        self.root.join(format!(
            "{}.{}.{}",
            id.as_str(),
            ARCHIVE_EXTENSION,
            PARTIAL_SUFFIX
        ))
    }

    /// `<root>/<name>.tar.gz`
    pub fn bundle_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, BUNDLE_EXTENSION))
    }

    /// Where a bundle is written before it is confirmed complete.
    pub fn partial_bundle_path(&self, name: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}.{}", name, BUNDLE_EXTENSION, PARTIAL_SUFFIX))
    }
}

/// Temporary sibling used for write-then-rename of a single tile.
pub fn partial_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> TilesLayout {
        TilesLayout::new("/data/tiles", ".jpg")
    }

    #[test]
    fn test_tile_path() {
        let id = RegionId::from_existing("r1");
        let path = layout().tile_path(&id, &TileCoord { zoom: 3, x: 5, y: 2 });
        assert_eq!(path, PathBuf::from("/data/tiles/r1/3/5/2.jpg"));
    }

    #[test]
    fn test_archive_and_bundle_paths() {
        let id = RegionId::from_existing("r1");
        assert_eq!(layout().archive_path(&id), PathBuf::from("/data/tiles/r1.zip"));
        assert_eq!(
            layout().partial_archive_path(&id),
            PathBuf::from("/data/tiles/r1.zip.partial")
        );
        assert_eq!(
            layout().bundle_path("run-1"),
            PathBuf::from("/data/tiles/run-1.tar.gz")
        );
    }

    #[test]
    fn test_partial_sibling() {
        assert_eq!(
            partial_sibling(Path::new("/a/b/7.jpg")),
            PathBuf::from("/a/b/7.jpg.partial")
        );
    }
}
