//! The run driver.
//!
//! Regions are processed strictly one at a time:
//!
//! ```text
//! Pending ──(archive exists)──────────────────────────▶ Skipped
//! Pending ──▶ Fetching ──(all zooms fetched, archived)──▶ Archived
//!                 │
//!                 └─(filesystem / archive error, cancel)──▶ Pending
//! ```
//!
//! Region N+1 starts only after region N's archive step finished. Once every
//! region is Archived or Skipped the archives are bundled and the bundle is
//! handed to the transporter.

use super::config::PipelineConfig;
use super::error::{PipelineError, RegionError};
use super::summary::{Delivery, RegionReport, RunSummary};
use crate::archive::{BatchAggregator, Bundle, BundleError, RegionArchiver};
use crate::fetch::{FetchStats, TileFetcher, TileRequest};
use crate::layout::TilesLayout;
use crate::pacing::Pacer;
use crate::provider::AsyncHttpClient;
use crate::region::{ArchiveIndex, GridPlanner, Polygon, Region, RegionStatus};
use crate::transport::{NoTransport, Transporter};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Composes planner, fetcher, archiver, aggregator and transporter.
pub struct Pipeline<C, P, T> {
    config: PipelineConfig,
    layout: TilesLayout,
    planner: GridPlanner,
    fetcher: TileFetcher<C>,
    archiver: RegionArchiver,
    aggregator: BatchAggregator,
    pacer: P,
    transporter: Option<T>,
}

impl<C, P> Pipeline<C, P, NoTransport>
where
    C: AsyncHttpClient + 'static,
    P: Pacer,
{
    /// Creates a pipeline without a transport step.
    pub fn new(config: PipelineConfig, client: Arc<C>, pacer: P) -> Result<Self, PipelineError> {
        config.validate()?;

        let layout = TilesLayout::new(config.tiles_dir(), config.tile_extension());
        let planner = GridPlanner::new(config.zooms(), config.source().label());
        let fetcher = TileFetcher::new(client)
            .with_fetch_timeout(config.fetch_timeout())
            .with_drain_timeout(config.drain_timeout())
            .with_stats(Arc::new(FetchStats::new()));

        Ok(Self {
            archiver: RegionArchiver::new(layout.clone()),
            aggregator: BatchAggregator::new(layout.clone()),
            config,
            layout,
            planner,
            fetcher,
            pacer,
            transporter: None,
        })
    }
}

impl<C, P, T> Pipeline<C, P, T>
where
    C: AsyncHttpClient + 'static,
    P: Pacer,
    T: Transporter,
{
    /// Adds a transporter that receives the bundle at the end of the run.
    pub fn with_transporter<U: Transporter>(self, transporter: U) -> Pipeline<C, P, U> {
        Pipeline {
            config: self.config,
            layout: self.layout,
            planner: self.planner,
            fetcher: self.fetcher,
            archiver: self.archiver,
            aggregator: self.aggregator,
            pacer: self.pacer,
            transporter: Some(transporter),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &TilesLayout {
        &self.layout
    }

    /// Plans every polygon against the archives already in the tiles root.
    ///
    /// Fails on the first polygon that cannot be planned, before any
    /// network traffic.
    pub fn plan(&self, polygons: &[Polygon]) -> Result<(Vec<Region>, ArchiveIndex), PipelineError> {
        if polygons.is_empty() {
            return Err(PipelineError::NoRegions);
        }

        let index = ArchiveIndex::scan(&self.layout).map_err(|source| PipelineError::Index {
            path: self.layout.root().to_path_buf(),
            source,
        })?;

        let regions = polygons
            .iter()
            .enumerate()
            .map(|(index_no, polygon)| {
                self.planner
                    .plan_region(polygon, &index)
                    .map_err(|source| PipelineError::Plan {
                        index: index_no,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((regions, index))
    }

    /// Runs the whole pipeline over `polygons`.
    ///
    /// Returns `Err` only when the run cannot start. Region, bundle and
    /// transport failures are reported in the [`RunSummary`].
    pub async fn run(
        &self,
        polygons: &[Polygon],
        cancellation_token: CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let (regions, mut index) = self.plan(polygons)?;

        info!(
            run_id = self.config.run_id(),
            regions = regions.len(),
            already_archived = regions.iter().filter(|r| r.status == RegionStatus::Skipped).count(),
            zooms = %self.config.zooms(),
            concurrency = self.config.concurrency(),
            root = %self.layout.root().display(),
            "Run planned"
        );

        let mut reports = Vec::with_capacity(regions.len());
        let mut cancelled = false;
        let mut fetched_before = false;

        for mut region in regions {
            if cancelled || cancellation_token.is_cancelled() {
                cancelled = true;
                reports.push(RegionReport::new(region));
                continue;
            }

            // Two polygons with the same box plan to the same id.
            if region.status == RegionStatus::Pending && index.contains(&region.id) {
                region.status = RegionStatus::Skipped;
            }
            if region.status == RegionStatus::Skipped {
                info!(region = %region.id, "Archive exists, skipping region");
                reports.push(RegionReport::new(region));
                continue;
            }

            if fetched_before && !self.pacer.pause(&cancellation_token).await {
                cancelled = true;
                reports.push(RegionReport::new(region));
                continue;
            }
            fetched_before = true;

            let report = self.process_region(region, &cancellation_token).await;
            if report.status() == RegionStatus::Archived {
                index.insert(report.region.id.clone());
            }
            if matches!(report.error, Some(RegionError::Cancelled)) {
                cancelled = true;
            }
            reports.push(report);
        }

        let mut summary = RunSummary {
            run_id: self.config.run_id().to_string(),
            regions: reports,
            bundle: None,
            bundle_error: None,
            delivery: Delivery::NotReached,
            cancelled,
            stats: self.fetcher.stats().snapshot(),
            elapsed: started.elapsed(),
        };

        if cancelled {
            warn!("Run cancelled; regions left pending will be resumed next run");
        } else if summary.unresolved_count() > 0 {
            warn!(
                unresolved = summary.unresolved_count(),
                "Some regions were not archived; skipping bundle and transport"
            );
        } else {
            match self.bundle().await {
                Ok(bundle) => {
                    summary.delivery = self.deliver(&bundle).await;
                    summary.bundle = Some(bundle);
                }
                Err(e) => {
                    error!(error = %e, "Bundling failed");
                    summary.bundle_error = Some(e);
                }
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            archived = summary.archived_count(),
            skipped = summary.skipped_count(),
            unresolved = summary.unresolved_count(),
            tiles_fetched = summary.tiles_fetched(),
            tiles_failed = summary.tiles_failed(),
            stats = %summary.stats,
            success = summary.is_success(),
            "Run complete"
        );
        Ok(summary)
    }

    /// Fetches every zoom level of one region, then archives it.
    async fn process_region(
        &self,
        mut region: Region,
        cancellation_token: &CancellationToken,
    ) -> RegionReport {
        let raw_dir = self.layout.region_dir(&region.id);
        if raw_dir.exists() {
            info!(
                region = %region.id,
                path = %raw_dir.display(),
                "Clearing stale raw tile directory"
            );
            if let Err(source) = tokio::fs::remove_dir_all(&raw_dir).await {
                error!(
                    region = %region.id,
                    path = %raw_dir.display(),
                    error = %source,
                    "Cannot clear raw tile directory"
                );
                let mut report = RegionReport::new(region);
                report.error = Some(RegionError::Clear { path: raw_dir, source });
                return report;
            }
        }

        region.status = RegionStatus::Fetching;
        info!(region = %region.id, zooms = %region.zooms, "Fetching region");
        let mut report = RegionReport::new(region.clone());

        let zooms = region.zooms;
        for zoom in zooms.iter() {
            let range = match self.planner.plan_tiles(&region, zoom) {
                Ok(range) => range,
                Err(e) => {
                    error!(region = %region.id, zoom = zoom, error = %e, "Cannot plan tiles");
                    return self.abandon(report, region, RegionError::Projection(e));
                }
            };

            let requests: Vec<TileRequest> = range
                .tiles()
                .map(|coord| {
                    TileRequest::new(
                        coord,
                        self.config.source().url_for(&coord),
                        self.layout.tile_path(&region.id, &coord),
                    )
                })
                .collect();

            info!(region = %region.id, zoom = zoom, tiles = requests.len(), "Fetching zoom level");
            let fetch = self
                .fetcher
                .fetch_all(requests, self.config.concurrency(), cancellation_token)
                .await;
            info!(
                region = %region.id,
                zoom = zoom,
                fetched = fetch.success_count(),
                total = fetch.len(),
                "Zoom level done"
            );
            report.record_zoom(zoom, &fetch);

            if let Some(fault) = fetch.fault {
                error!(
                    region = %region.id,
                    zoom = zoom,
                    error = %fault,
                    "Region abandoned after filesystem failure"
                );
                return self.abandon(report, region, RegionError::Filesystem(fault));
            }
            if fetch.cancelled {
                return self.abandon(report, region, RegionError::Cancelled);
            }
        }

        let failed = report.tiles_failed();
        match self.archiver.archive(&mut region, failed).await {
            Ok(archive) => report.archive = Some(archive),
            Err(e) => {
                error!(region = %region.id, error = %e, "Archiving failed; raw tiles kept");
                region.status = RegionStatus::Pending;
                report.error = Some(RegionError::Archive(e));
            }
        }
        report.region = region;
        report
    }

    /// Puts the region back to Pending with the reason recorded.
    fn abandon(
        &self,
        mut report: RegionReport,
        mut region: Region,
        reason: RegionError,
    ) -> RegionReport {
        region.status = RegionStatus::Pending;
        report.region = region;
        report.error = Some(reason);
        report
    }

    async fn bundle(&self) -> Result<Bundle, BundleError> {
        let archives = self.aggregator.collect_archives()?;
        self.aggregator.aggregate(archives, self.config.run_id()).await
    }

    async fn deliver(&self, bundle: &Bundle) -> Delivery {
        let Some(transporter) = &self.transporter else {
            info!(bundle = %bundle.path.display(), "No transport configured; bundle left in place");
            return Delivery::Disabled;
        };

        let destination = transporter.destination();
        info!(bundle = %bundle.path.display(), destination = %destination, "Sending bundle");
        match transporter.push(&bundle.path).await {
            Ok(()) => Delivery::Delivered { destination },
            Err(e) => {
                error!(
                    bundle = %bundle.path.display(),
                    destination = %destination,
                    error = %e,
                    "Transport failed; bundle kept on disk"
                );
                Delivery::Failed(e)
            }
        }
    }
}
