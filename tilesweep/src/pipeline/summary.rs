//! Per-region reports and the run summary.

use super::error::RegionError;
use crate::archive::{Archive, Bundle, BundleError};
use crate::fetch::{FetchReport, FetchStatsSnapshot};
use crate::region::{Region, RegionStatus};
use crate::transport::TransportError;
use std::collections::BTreeMap;
use std::time::Duration;

/// Fetch counts for one zoom level of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomReport {
    pub zoom: u8,
    pub requested: usize,
    pub fetched: usize,
    pub failed: usize,
}

/// What happened to one region.
#[derive(Debug)]
pub struct RegionReport {
    /// The region with its final status
    pub region: Region,
    pub zooms: Vec<ZoomReport>,
    pub archive: Option<Archive>,
    pub error: Option<RegionError>,
    /// Tile failures by kind (`status`, `decode`, ...)
    pub failures_by_kind: BTreeMap<&'static str, usize>,
}

impl RegionReport {
    pub(crate) fn new(region: Region) -> Self {
        Self {
            region,
            zooms: Vec::new(),
            archive: None,
            error: None,
            failures_by_kind: BTreeMap::new(),
        }
    }

    pub(crate) fn record_zoom(&mut self, zoom: u8, fetch: &FetchReport) {
        self.zooms.push(ZoomReport {
            zoom,
            requested: fetch.len(),
            fetched: fetch.success_count(),
            failed: fetch.failure_count(),
        });
        for (_, failure) in fetch.failures() {
            *self.failures_by_kind.entry(failure.kind()).or_insert(0) += 1;
        }
    }

    pub fn status(&self) -> RegionStatus {
        self.region.status
    }

    pub fn tiles_requested(&self) -> usize {
        self.zooms.iter().map(|z| z.requested).sum()
    }

    pub fn tiles_fetched(&self) -> usize {
        self.zooms.iter().map(|z| z.fetched).sum()
    }

    pub fn tiles_failed(&self) -> usize {
        self.zooms.iter().map(|z| z.failed).sum()
    }

    /// Archived or skipped.
    pub fn is_resolved(&self) -> bool {
        self.region.status.is_terminal()
    }
}

/// Outcome of the transport step.
#[derive(Debug)]
pub enum Delivery {
    /// The run never got to transport (unresolved regions, cancellation or
    /// no bundle)
    NotReached,
    /// No transporter configured
    Disabled,
    Delivered { destination: String },
    Failed(TransportError),
}

/// Everything a caller needs to report on a run and pick an exit code.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: String,
    pub regions: Vec<RegionReport>,
    pub bundle: Option<Bundle>,
    pub bundle_error: Option<BundleError>,
    pub delivery: Delivery,
    pub cancelled: bool,
    pub stats: FetchStatsSnapshot,
    pub elapsed: Duration,
}

impl RunSummary {
    fn count(&self, status: RegionStatus) -> usize {
        self.regions.iter().filter(|r| r.status() == status).count()
    }

    pub fn archived_count(&self) -> usize {
        self.count(RegionStatus::Archived)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(RegionStatus::Skipped)
    }

    /// Regions left without an archive.
    pub fn unresolved_count(&self) -> usize {
        self.regions.iter().filter(|r| !r.is_resolved()).count()
    }

    pub fn tiles_fetched(&self) -> usize {
        self.regions.iter().map(|r| r.tiles_fetched()).sum()
    }

    pub fn tiles_failed(&self) -> usize {
        self.regions.iter().map(|r| r.tiles_failed()).sum()
    }

    /// Every region resolved, the bundle written and, if configured,
    /// delivered.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.unresolved_count() == 0
            && self.bundle.is_some()
            && self.bundle_error.is_none()
            && matches!(
                self.delivery,
                Delivery::Delivered { .. } | Delivery::Disabled
            )
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}
