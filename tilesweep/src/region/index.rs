//! Index of regions that already have an archive.
//!
//! This is the whole of the resumability state: a region whose archive
//! exists is never fetched again.

use super::types::RegionId;
use crate::layout::{TilesLayout, ARCHIVE_EXTENSION};
use std::collections::BTreeSet;
use std::io;
use tracing::debug;

/// Set of already-archived region ids.
///
/// Read by the driver before each region and written once per archived
/// region; the driver is its only writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveIndex {
    archived: BTreeSet<RegionId>,
}

impl ArchiveIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the index from the `*.zip` files directly under the tiles root.
    ///
    /// A missing root is an empty index. Partially written archives
    /// (`*.zip.partial`) are ignored.
    pub fn scan(layout: &TilesLayout) -> io::Result<Self> {
        let root = layout.root();
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(e) => return Err(e),
        };

        let suffix = format!(".{}", ARCHIVE_EXTENSION);
        let mut archived = BTreeSet::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(stem) = name.strip_suffix(&suffix) {
                if !stem.is_empty() {
                    archived.insert(RegionId::from_existing(stem));
                }
            }
        }

        debug!(root = %root.display(), archives = archived.len(), "Scanned archive index");
        Ok(Self { archived })
    }

    pub fn contains(&self, id: &RegionId) -> bool {
        self.archived.contains(id)
    }

    /// Records a freshly archived region. Returns false if it was already present.
    pub fn insert(&mut self, id: RegionId) -> bool {
        self.archived.insert(id)
    }

    pub fn len(&self) -> usize {
        self.archived.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archived.is_empty()
    }

    /// Archived ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &RegionId> {
        self.archived.iter()
    }
}
