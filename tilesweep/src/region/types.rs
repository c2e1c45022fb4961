//! Region type definitions

use super::polygon::BoundingBox;
use crate::coord::MAX_ZOOM;
use std::fmt;
use thiserror::Error;

/// Inclusive range of zoom levels processed for every region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoomRange {
    min: u8,
    max: u8,
}

/// Invalid zoom range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid zoom range {min}..={max} (need min <= max <= {})", MAX_ZOOM)]
pub struct ZoomRangeError {
    pub min: u8,
    pub max: u8,
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Result<Self, ZoomRangeError> {
        if min > max || max > MAX_ZOOM {
            return Err(ZoomRangeError { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Zoom levels in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> {
        self.min..=self.max
    }

    pub fn len(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { min: 1, max: 16 }
    }
}

impl fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Stable, filesystem-safe identifier of a region.
///
/// Derived only from the bounding box, zoom range and layer label, so the
/// same polygon always maps to the same id regardless of input order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(String);

impl RegionId {
    /// Builds the id `<north>_<west>_<south>_<east>_z<min>-<max>_<layer>`.
    pub fn derive(bbox: &BoundingBox, zooms: ZoomRange, layer: &str) -> Self {
        let layer: String = layer
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        let layer = if layer.is_empty() { "tiles".to_string() } else { layer };

        Self(format!(
            "{}_{}_{}_{}_z{}_{}",
            fmt_degrees(bbox.north),
            fmt_degrees(bbox.west),
            fmt_degrees(bbox.south),
            fmt_degrees(bbox.east),
            zooms,
            layer
        ))
    }

    /// Wraps an id recovered from disk (e.g. an archive file stem).
    pub fn from_existing(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Six decimals (~10 cm) with negative zero folded into zero.
fn fmt_degrees(value: f64) -> String {
    format!("{:.6}", value + 0.0)
}

/// Lifecycle of a region within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionStatus {
    /// Planned, nothing durable yet (also the state after an aborted attempt)
    Pending,
    /// Tiles are being fetched
    Fetching,
    /// Archive written and raw tiles reclaimed
    Archived,
    /// An archive already existed, nothing was fetched
    Skipped,
}

impl RegionStatus {
    /// Whether the region needs no further work this run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RegionStatus::Archived | RegionStatus::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionStatus::Pending => "pending",
            RegionStatus::Fetching => "fetching",
            RegionStatus::Archived => "archived",
            RegionStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RegionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One polygon's processing unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub bbox: BoundingBox,
    pub zooms: ZoomRange,
    pub status: RegionStatus,
}
