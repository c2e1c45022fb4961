//! Boundary input.
//!
//! The pipeline consumes an ordered list of [`Polygon`]s and never looks at
//! the file format. [`KmlBoundaryReader`] is the one format shipped.

mod kml;

pub use kml::KmlBoundaryReader;

use crate::region::{Polygon, PolygonError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Boundary file extension looked for by [`find_boundary_files`].
pub const BOUNDARY_EXTENSION: &str = "kml";

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("no .{} boundary files in {}", BOUNDARY_EXTENSION, .0.display())]
    NoBoundaryFiles(PathBuf),

    #[error("boundary files in {} contain no polygons", .0.display())]
    NoPolygons(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed boundary file {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("invalid polygon in {}: {source}", .path.display())]
    InvalidPolygon {
        path: PathBuf,
        #[source]
        source: PolygonError,
    },
}

/// Parses one boundary file into polygons, in document order.
pub trait BoundaryReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<Polygon>, BoundaryError>;
}

/// Boundary files directly inside `dir`, sorted by name.
pub fn find_boundary_files(dir: &Path) -> Result<Vec<PathBuf>, BoundaryError> {
    let entries = fs::read_dir(dir).map_err(|source| BoundaryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| BoundaryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(BOUNDARY_EXTENSION));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads every boundary file in `dir` and concatenates their polygons.
///
/// Fails when the directory holds no boundary files or no polygons, so a
/// run never starts with nothing to do.
pub fn load_polygons<R: BoundaryReader>(
    reader: &R,
    dir: &Path,
) -> Result<Vec<Polygon>, BoundaryError> {
    let files = find_boundary_files(dir)?;
    if files.is_empty() {
        return Err(BoundaryError::NoBoundaryFiles(dir.to_path_buf()));
    }

    let mut polygons = Vec::new();
    for file in &files {
        let found = reader.read(file)?;
        debug!(file = %file.display(), polygons = found.len(), "Boundary file read");
        polygons.extend(found);
    }

    if polygons.is_empty() {
        return Err(BoundaryError::NoPolygons(dir.to_path_buf()));
    }
    info!(files = files.len(), polygons = polygons.len(), "Boundaries loaded");
    Ok(polygons)
}
