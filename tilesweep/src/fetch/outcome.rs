//! Per-tile outcomes and the report returned by a fetch batch.

use super::request::TileRequest;
use crate::provider::ProviderError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single tile did not make it to disk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// Connection or transfer failure
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded its deadline
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// The payload is not a decodable image
    #[error("payload is not a valid image: {0}")]
    Decode(String),

    /// The tile could not be written; fatal to the region
    #[error("cannot write {}: {reason}", .path.display())]
    Filesystem { path: PathBuf, reason: String },

    /// Never started because the batch was cancelled or stopped
    #[error("cancelled before the request was sent")]
    Cancelled,

    /// Started but abandoned (drain timeout or task panic)
    #[error("fetch abandoned: {0}")]
    Aborted(String),
}

impl FetchFailure {
    /// Short category name for logs and per-kind counts.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::Network(_) => "network",
            FetchFailure::Timeout => "timeout",
            FetchFailure::Status(_) => "status",
            FetchFailure::Decode(_) => "decode",
            FetchFailure::Filesystem { .. } => "filesystem",
            FetchFailure::Cancelled => "cancelled",
            FetchFailure::Aborted(_) => "aborted",
        }
    }

    /// Filesystem failures abort the region rather than just the tile.
    pub fn is_filesystem(&self) -> bool {
        matches!(self, FetchFailure::Filesystem { .. })
    }
}

impl From<ProviderError> for FetchFailure {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Status { status, .. } => FetchFailure::Status(status),
            ProviderError::Timeout(_) => FetchFailure::Timeout,
            ProviderError::Network(msg) | ProviderError::Client(msg) => FetchFailure::Network(msg),
        }
    }
}

/// Result of one tile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Tile validated and written; `bytes` is the payload size
    Success { bytes: usize },
    Failed(FetchFailure),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchOutcome::Failed(f) => Some(f),
            FetchOutcome::Success { .. } => None,
        }
    }
}

/// Everything that happened to one batch of requests.
///
/// Every request handed to the fetcher appears exactly once in `outcomes`,
/// paired with the request itself.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<(TileRequest, FetchOutcome)>,
    /// First filesystem failure; set when the batch stopped early because of it
    pub fault: Option<FetchFailure>,
    /// Whether the run-level cancellation signal interrupted the batch
    pub cancelled: bool,
    /// Highest number of simultaneous fetches observed
    pub peak_in_flight: usize,
}

impl FetchReport {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    pub(crate) fn push(&mut self, request: TileRequest, outcome: FetchOutcome) {
        self.outcomes.push((request, outcome));
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Failed requests with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&TileRequest, &FetchFailure)> {
        self.outcomes
            .iter()
            .filter_map(|(req, outcome)| outcome.failure().map(|f| (req, f)))
    }

    /// True when every request got a real attempt: no fault and no cancellation.
    pub fn is_complete(&self) -> bool {
        self.fault.is_none() && !self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;

    fn request(x: u32) -> TileRequest {
        TileRequest::new(
            TileCoord::new(1, x, 0).unwrap(),
            format!("http://t/1/{}/0", x),
            format!("/tmp/1/{}/0.jpg", x),
        )
    }

    #[test]
    fn test_provider_error_mapping() {
        let status = ProviderError::Status {
            status: 404,
            url: "u".into(),
        };
        assert_eq!(FetchFailure::from(status), FetchFailure::Status(404));
        assert_eq!(
            FetchFailure::from(ProviderError::Timeout("slow".into())),
            FetchFailure::Timeout
        );
        assert_eq!(
            FetchFailure::from(ProviderError::Network("reset".into())).kind(),
            "network"
        );
    }

    #[test]
    fn test_report_counts() {
        let mut report = FetchReport::with_capacity(3);
        report.push(request(0), FetchOutcome::Success { bytes: 10 });
        report.push(request(1), FetchOutcome::Failed(FetchFailure::Status(500)));
        report.push(request(1), FetchOutcome::Success { bytes: 12 });

        assert_eq!(report.len(), 3);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert!(report.is_complete());

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.coord.x, 1);
    }

    #[test]
    fn test_fault_makes_report_incomplete() {
        let mut report = FetchReport::default();
        report.fault = Some(FetchFailure::Filesystem {
            path: "/ro/1/0/0.jpg".into(),
            reason: "read-only file system".into(),
        });
        assert!(!report.is_complete());
        assert!(report.fault.as_ref().unwrap().is_filesystem());
    }
}
