//! Run bundle: every region archive in one `.tar.gz`.
//!
//! Archives are streamed from disk into the gzip encoder one at a time, so
//! memory use does not depend on how many tiles the archives hold.

use crate::layout::{TilesLayout, ARCHIVE_EXTENSION};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// The compressed bundle handed to the transporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub path: PathBuf,
    /// Archives inside the bundle, in the order they were added
    pub archives: Vec<PathBuf>,
    /// An identical bundle already existed and was left untouched
    pub reused: bool,
}

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("no region archives to bundle in {}", .0.display())]
    NoArchives(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("bundle task failed: {0}")]
    Task(String),
}

impl BundleError {
    fn io(path: &Path, source: io::Error) -> Self {
        BundleError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Gathers region archives into `<tiles root>/<name>.tar.gz`.
#[derive(Debug, Clone)]
pub struct BatchAggregator {
    layout: TilesLayout,
}

impl BatchAggregator {
    pub fn new(layout: TilesLayout) -> Self {
        Self { layout }
    }

    /// Every region archive in the tiles root, sorted by file name.
    pub fn collect_archives(&self) -> Result<Vec<PathBuf>, BundleError> {
        let root = self.layout.root();
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BundleError::io(root, e)),
        };

        let suffix = format!(".{}", ARCHIVE_EXTENSION);
        let mut archives = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BundleError::io(root, e))?;
            let path = entry.path();
            let is_archive = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix));
            if is_archive && path.is_file() {
                archives.push(path);
            }
        }
        archives.sort();
        Ok(archives)
    }

    /// Bundles `archives` on the blocking pool.
    pub async fn aggregate(
        &self,
        archives: Vec<PathBuf>,
        name: &str,
    ) -> Result<Bundle, BundleError> {
        let aggregator = self.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || aggregator.aggregate_blocking(archives, &name))
            .await
            .map_err(|e| BundleError::Task(e.to_string()))?
    }

    /// Bundles `archives` into `<root>/<name>.tar.gz`.
    ///
    /// Entries are stored under their file names. If the bundle already
    /// exists with exactly these entries, byte for byte, it is reused as is.
    pub fn aggregate_blocking(
        &self,
        archives: Vec<PathBuf>,
        name: &str,
    ) -> Result<Bundle, BundleError> {
        if archives.is_empty() {
            return Err(BundleError::NoArchives(self.layout.root().to_path_buf()));
        }

        let target = self.layout.bundle_path(name);
        let wanted: Vec<String> = archives.iter().map(|p| file_name(p)).collect();

        if target.is_file() {
            if let Ok(existing) = digest_entries(&target) {
                let current = archives
                    .iter()
                    .zip(&wanted)
                    .map(|(path, name)| Ok((name.clone(), digest_file(path)?)))
                    .collect::<io::Result<Vec<_>>>()
                    .map_err(|e| BundleError::io(self.layout.root(), e))?;
                if existing == current {
                    info!(
                        path = %target.display(),
                        archives = archives.len(),
                        "Bundle already up to date"
                    );
                    return Ok(Bundle {
                        path: target,
                        archives,
                        reused: true,
                    });
                }
            }
        }

        let partial = self.layout.partial_bundle_path(name);
        if let Err(e) = write_bundle(&partial, &archives, &wanted) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, &target).map_err(|e| {
            let _ = fs::remove_file(&partial);
            BundleError::io(&target, e)
        })?;

        info!(
            path = %target.display(),
            archives = archives.len(),
            "Bundle written"
        );

        Ok(Bundle {
            path: target,
            archives,
            reused: false,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_bundle(partial: &Path, archives: &[PathBuf], names: &[String]) -> Result<(), BundleError> {
    let out = File::create(partial).map_err(|e| BundleError::io(partial, e))?;
    let encoder = GzEncoder::new(out, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (archive, name) in archives.iter().zip(names) {
        builder
            .append_path_with_name(archive, name)
            .map_err(|e| BundleError::io(archive, e))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| BundleError::io(partial, e))?;
    let out = encoder.finish().map_err(|e| BundleError::io(partial, e))?;
    out.sync_all().map_err(|e| BundleError::io(partial, e))?;
    Ok(())
}

/// Name and SHA-256 of every entry of an existing bundle, in stored order.
fn digest_entries(path: &Path) -> io::Result<Vec<(String, String)>> {
    let file = File::open(path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut entries = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();
        entries.push((name, digest_reader(&mut entry)?));
    }
    Ok(entries)
}

fn digest_file(path: &Path) -> io::Result<String> {
    digest_reader(&mut File::open(path)?)
}

fn digest_reader(reader: &mut impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn list_entries(path: &Path) -> Vec<String> {
        digest_entries(path)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    fn setup(archives: &[&str]) -> (TempDir, TilesLayout) {
        let temp = TempDir::new().unwrap();
        let layout = TilesLayout::new(temp.path(), "jpg");
        for name in archives {
            fs::write(temp.path().join(name), name.as_bytes()).unwrap();
        }
        (temp, layout)
    }

    #[test]
    fn test_collect_only_zip_files() {
        let (temp, layout) = setup(&["b.zip", "a.zip", "notes.txt", "c.zip.partial"]);
        fs::create_dir(temp.path().join("raw_region")).unwrap();

        let archives = BatchAggregator::new(layout).collect_archives().unwrap();
        let names: Vec<_> = archives.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.zip", "b.zip"]);
    }

    #[test]
    fn test_collect_missing_root() {
        let layout = TilesLayout::new("/nonexistent/tilesweep/root", "jpg");
        assert!(BatchAggregator::new(layout).collect_archives().unwrap().is_empty());
    }

    #[test]
    fn test_bundle_contains_every_archive() {
        let (_temp, layout) = setup(&["a.zip", "b.zip"]);
        let aggregator = BatchAggregator::new(layout.clone());
        let archives = aggregator.collect_archives().unwrap();

        let bundle = aggregator.aggregate_blocking(archives.clone(), "run-1").unwrap();

        assert_eq!(bundle.path, layout.bundle_path("run-1"));
        assert!(!bundle.reused);
        assert_eq!(bundle.archives, archives);
        assert_eq!(list_entries(&bundle.path), vec!["a.zip", "b.zip"]);
        assert!(!layout.partial_bundle_path("run-1").exists());
    }

    #[test]
    fn test_identical_bundle_is_reused() {
        let (_temp, layout) = setup(&["a.zip"]);
        let aggregator = BatchAggregator::new(layout);
        let archives = aggregator.collect_archives().unwrap();

        let first = aggregator.aggregate_blocking(archives.clone(), "run").unwrap();
        let before = fs::read(&first.path).unwrap();
        let second = aggregator.aggregate_blocking(archives, "run").unwrap();

        assert!(second.reused);
        assert_eq!(fs::read(&second.path).unwrap(), before);
    }

    #[test]
    fn test_changed_archive_set_rebuilds() {
        let (temp, layout) = setup(&["a.zip"]);
        let aggregator = BatchAggregator::new(layout);
        aggregator
            .aggregate_blocking(aggregator.collect_archives().unwrap(), "run")
            .unwrap();

        fs::write(temp.path().join("b.zip"), b"b").unwrap();
        let bundle = aggregator
            .aggregate_blocking(aggregator.collect_archives().unwrap(), "run")
            .unwrap();

        assert!(!bundle.reused);
        assert_eq!(list_entries(&bundle.path), vec!["a.zip", "b.zip"]);
    }

    #[test]
    fn test_rewritten_archive_rebuilds() {
        let (temp, layout) = setup(&[]);
        let archive = temp.path().join("a.zip");
        fs::write(&archive, b"old archive, 3 tiles").unwrap();
        let aggregator = BatchAggregator::new(layout);
        aggregator.aggregate_blocking(vec![archive.clone()], "run").unwrap();

        fs::write(&archive, b"new archive, 4 tiles").unwrap();
        let bundle = aggregator.aggregate_blocking(vec![archive.clone()], "run").unwrap();

        assert!(!bundle.reused);
        let entries = digest_entries(&bundle.path).unwrap();
        assert_eq!(entries, vec![("a.zip".to_string(), digest_file(&archive).unwrap())]);
    }

    #[test]
    fn test_same_size_rewrite_rebuilds() {
        let (temp, layout) = setup(&[]);
        let archive = temp.path().join("a.zip");
        fs::write(&archive, b"aaaa").unwrap();
        let aggregator = BatchAggregator::new(layout);
        aggregator.aggregate_blocking(vec![archive.clone()], "run").unwrap();

        fs::write(&archive, b"bbbb").unwrap();
        let bundle = aggregator.aggregate_blocking(vec![archive], "run").unwrap();
        assert!(!bundle.reused);
    }

    #[test]
    fn test_no_archives_is_an_error() {
        let (_temp, layout) = setup(&[]);
        let err = BatchAggregator::new(layout)
            .aggregate_blocking(Vec::new(), "run")
            .unwrap_err();
        assert!(matches!(err, BundleError::NoArchives(_)));
    }

    #[tokio::test]
    async fn test_async_aggregate() {
        let (_temp, layout) = setup(&["x.zip"]);
        let aggregator = BatchAggregator::new(layout);
        let archives = aggregator.collect_archives().unwrap();
        let bundle = aggregator.aggregate(archives, "async-run").await.unwrap();
        assert!(bundle.path.exists());
    }
}
