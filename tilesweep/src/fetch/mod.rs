//! Concurrent tile fetching.
//!
//! [`TileFetcher::fetch_all`] takes one batch of [`TileRequest`]s (one zoom
//! level of one region) and returns a [`FetchReport`] with exactly one
//! [`FetchOutcome`] per request. A tile counts as fetched only when the
//! server answered 2xx, the payload decoded as an image and the bytes were
//! written to the request's destination.

mod fetcher;
mod limiter;
mod outcome;
mod request;
mod stats;
mod validate;
mod writer;

pub use fetcher::{TileFetcher, DEFAULT_DRAIN_TIMEOUT, DEFAULT_FETCH_TIMEOUT};
pub use limiter::{ConcurrencyLimiter, ConcurrencyPermit};
pub use outcome::{FetchFailure, FetchOutcome, FetchReport};
pub use request::TileRequest;
pub use stats::{FetchStats, FetchStatsSnapshot};
pub use validate::validate_image;
pub use writer::write_tile;
