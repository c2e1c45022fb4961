//! tilesweep - plan, fetch and archive raster map tiles for polygonal regions
//!
//! The library turns boundary polygons into a grid of regions, downloads the
//! Web Mercator tiles covering each region at every configured zoom level,
//! packs each completed region into a zip archive and bundles the archives of
//! a run into a single `tar.gz` for delivery.
//!
//! # High-Level API
//!
//! The [`pipeline`] module drives everything:
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilesweep::boundary::{load_polygons, KmlBoundaryReader};
//! use tilesweep::pacing::CooldownPacer;
//! use tilesweep::pipeline::{Pipeline, PipelineConfig};
//! use tilesweep::provider::AsyncReqwestClient;
//! use tokio_util::sync::CancellationToken;
//!
//! let polygons = load_polygons(&KmlBoundaryReader, "boundaries".as_ref())?;
//! let config = PipelineConfig::new("tiles");
//! let client = Arc::new(AsyncReqwestClient::with_timeouts(
//!     config.fetch_timeout(),
//!     config.connect_timeout(),
//! )?);
//! let pipeline = Pipeline::new(config, client, CooldownPacer::default())?;
//! let summary = pipeline.run(&polygons, CancellationToken::new()).await?;
//! ```

pub mod archive;
pub mod boundary;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod layout;
pub mod logging;
pub mod pacing;
pub mod pipeline;
pub mod provider;
pub mod region;
pub mod transport;

/// Version of the tilesweep library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
