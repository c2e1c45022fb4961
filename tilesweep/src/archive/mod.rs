//! Region archives and the run bundle.
//!
//! [`RegionArchiver`] turns a region's raw tile tree into `<id>.zip` and is
//! the only code that deletes raw tile directories. [`BatchAggregator`]
//! packs the region archives into one `<run id>.tar.gz` for transport.

mod archiver;
mod bundle;

pub use archiver::{Archive, ArchiveError, RegionArchiver};
pub use bundle::{BatchAggregator, Bundle, BundleError};
