//! Per-region zip archives.
//!
//! The archive is written next to its final name as `<id>.zip.partial`,
//! synced, reopened and checked for the expected entry count, and only then
//! renamed into place. The raw tile directory is removed after the rename.

use crate::layout::{TilesLayout, PARTIAL_SUFFIX};
use crate::region::{Region, RegionId, RegionStatus};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A region's tiles, compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    pub region_id: RegionId,
    /// Tile files stored in the archive
    pub tile_count: usize,
    /// Tiles of this region whose fetch failed
    pub failed_tiles: usize,
}

/// Errors producing a region archive. Raw tiles are never removed when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Nothing was fetched for the region
    #[error("region {region} has no fetched tiles ({failed} failed)")]
    Empty { region: RegionId, failed: usize },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("zip error on {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Reopened archive does not hold every tile
    #[error("archive {} holds {found} entries, expected {expected}", .path.display())]
    Incomplete {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("archive task failed: {0}")]
    Task(String),
}

impl ArchiveError {
    fn io(path: &Path, source: io::Error) -> Self {
        ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(path: &Path, source: zip::result::ZipError) -> Self {
        ArchiveError::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Compresses region directories into `<tiles root>/<region id>.zip`.
#[derive(Debug, Clone)]
pub struct RegionArchiver {
    layout: TilesLayout,
}

impl RegionArchiver {
    pub fn new(layout: TilesLayout) -> Self {
        Self { layout }
    }

    /// Archives a region on the blocking pool and marks it
    /// [`RegionStatus::Archived`] once the archive is in place.
    pub async fn archive(
        &self,
        region: &mut Region,
        failed_tiles: usize,
    ) -> Result<Archive, ArchiveError> {
        let archiver = self.clone();
        let region_id = region.id.clone();
        let archive = tokio::task::spawn_blocking(move || {
            archiver.archive_blocking(&region_id, failed_tiles)
        })
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))??;

        region.status = RegionStatus::Archived;
        Ok(archive)
    }

    /// Archives a region on the current thread.
    pub fn archive_blocking(
        &self,
        region_id: &RegionId,
        failed_tiles: usize,
    ) -> Result<Archive, ArchiveError> {
        let source = self.layout.region_dir(region_id);
        let files = collect_tiles(&source)?;
        if files.is_empty() {
            return Err(ArchiveError::Empty {
                region: region_id.clone(),
                failed: failed_tiles,
            });
        }

        let partial = self.layout.partial_archive_path(region_id);
        let target = self.layout.archive_path(region_id);

        let written =
            write_zip(&partial, &source, &files).and_then(|_| verify_zip(&partial, files.len()));
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        if let Err(e) = fs::rename(&partial, &target) {
            let _ = fs::remove_file(&partial);
            return Err(ArchiveError::io(&target, e));
        }

        info!(
            region = %region_id,
            tiles = files.len(),
            failed = failed_tiles,
            path = %target.display(),
            "Region archived"
        );

        if let Err(e) = fs::remove_dir_all(&source) {
            warn!(
                region = %region_id,
                path = %source.display(),
                error = %e,
                "Archive written but raw tile directory could not be removed"
            );
        } else {
            debug!(region = %region_id, path = %source.display(), "Raw tile directory removed");
        }

        Ok(Archive {
            path: target,
            region_id: region_id.clone(),
            tile_count: files.len(),
            failed_tiles,
        })
    }
}

/// Tile files under `root`, sorted, with leftover `.partial` files skipped.
/// A missing directory has no tiles.
fn collect_tiles(root: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let partial_ext = format!(".{}", PARTIAL_SUFFIX);
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            ArchiveError::io(&path, io::Error::other(e.to_string()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().ends_with(&partial_ext) {
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

/// Entry name inside the archive: the path relative to the region
/// directory, `/`-separated.
fn entry_name(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn write_zip(partial: &Path, root: &Path, files: &[PathBuf]) -> Result<(), ArchiveError> {
    let out = File::create(partial).map_err(|e| ArchiveError::io(partial, e))?;
    let mut zip = ZipWriter::new(out);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
        zip.start_file(entry_name(root, file), options)
            .map_err(|e| ArchiveError::zip(partial, e))?;
        let mut input = File::open(file).map_err(|e| ArchiveError::io(file, e))?;
        io::copy(&mut input, &mut zip).map_err(|e| ArchiveError::io(partial, e))?;
    }

    let out = zip.finish().map_err(|e| ArchiveError::zip(partial, e))?;
    out.sync_all().map_err(|e| ArchiveError::io(partial, e))?;
    Ok(())
}

fn verify_zip(path: &Path, expected: usize) -> Result<(), ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    let archive = ZipArchive::new(file).map_err(|e| ArchiveError::zip(path, e))?;
    if archive.len() != expected {
        return Err(ArchiveError::Incomplete {
            path: path.to_path_buf(),
            expected,
            found: archive.len(),
        });
    }
    Ok(())
}
