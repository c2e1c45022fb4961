//! Permit-bounded tile fetching.
//!
//! Tasks are spawned one at a time as permits become available, so the
//! number of spawned tasks never exceeds the concurrency limit and nothing
//! queues inside the runtime. Each task carries a ticket naming its request;
//! the outcome is paired with the request through that ticket, never through
//! completion order.
//!
//! # Stopping early
//!
//! - A filesystem failure stops submission; in-flight tasks finish normally
//!   and the failure is reported as [`FetchReport::fault`].
//! - Cancellation stops submission and gives in-flight tasks `drain_timeout`
//!   to finish before they are aborted.
//!
//! Requests that were never sent are reported as [`FetchFailure::Cancelled`],
//! abandoned ones as [`FetchFailure::Aborted`].

use super::limiter::{ConcurrencyLimiter, ConcurrencyPermit};
use super::outcome::{FetchFailure, FetchOutcome, FetchReport};
use super::request::TileRequest;
use super::stats::FetchStats;
use super::validate::validate_image;
use super::writer::write_tile;
use crate::provider::AsyncHttpClient;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default per-fetch deadline.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time in-flight fetches get to finish after cancellation.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

type Ticket = u64;

/// Fetches batches of tiles through an [`AsyncHttpClient`].
pub struct TileFetcher<C> {
    client: Arc<C>,
    fetch_timeout: Duration,
    drain_timeout: Duration,
    stats: Arc<FetchStats>,
}

impl<C> TileFetcher<C>
where
    C: AsyncHttpClient + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            stats: Arc::new(FetchStats::new()),
        }
    }

    /// Sets the deadline for one fetch (request, body and validation).
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets how long in-flight fetches may run after cancellation.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Shares session statistics with other fetchers.
    pub fn with_stats(mut self, stats: Arc<FetchStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> Arc<FetchStats> {
        Arc::clone(&self.stats)
    }

    /// Fetches every request with at most `concurrency` in flight.
    ///
    /// Every request appears exactly once in the returned report. A single
    /// attempt is made per tile.
    pub async fn fetch_all(
        &self,
        requests: Vec<TileRequest>,
        concurrency: usize,
        cancellation_token: &CancellationToken,
    ) -> FetchReport {
        let mut report = FetchReport::with_capacity(requests.len());
        let limiter = ConcurrencyLimiter::new(concurrency, "tile_fetch");
        let mut pending: VecDeque<TileRequest> = requests.into();
        let mut in_flight: HashMap<Ticket, TileRequest> = HashMap::new();
        let mut tasks: JoinSet<(Ticket, FetchOutcome)> = JoinSet::new();
        let mut next_ticket: Ticket = 0;

        loop {
            let accepting =
                report.fault.is_none() && !cancellation_token.is_cancelled();

            while accepting && !pending.is_empty() {
                let Some(permit) = limiter.try_acquire() else {
                    break;
                };
                let Some(request) = pending.pop_front() else {
                    break;
                };
                let ticket = next_ticket;
                next_ticket += 1;
                self.spawn_fetch(&mut tasks, ticket, request.clone(), permit);
                in_flight.insert(ticket, request);
            }

            if tasks.is_empty() && (!accepting || pending.is_empty()) {
                break;
            }

            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => {
                    report.cancelled = true;
                    debug!(
                        pending = pending.len(),
                        active = tasks.len(),
                        "Fetch cancelled, draining in-flight requests"
                    );
                    break;
                }

                joined = tasks.join_next() => {
                    if let Some(joined) = joined {
                        record(joined, &mut in_flight, &mut report);
                    }
                }
            }
        }

        if cancellation_token.is_cancelled() && !pending.is_empty() {
            report.cancelled = true;
        }
        if !tasks.is_empty() {
            self.drain(&mut tasks, &mut in_flight, &mut report).await;
        }

        for (_, request) in in_flight.drain() {
            report.push(
                request,
                FetchOutcome::Failed(FetchFailure::Aborted(
                    "task did not complete".to_string(),
                )),
            );
        }
        for request in pending {
            report.push(request, FetchOutcome::Failed(FetchFailure::Cancelled));
        }

        report.peak_in_flight = limiter.peak_in_flight();
        debug!(
            success = report.success_count(),
            failed = report.failure_count(),
            peak_in_flight = report.peak_in_flight,
            cancelled = report.cancelled,
            "Fetch batch complete"
        );
        report
    }

    fn spawn_fetch(
        &self,
        tasks: &mut JoinSet<(Ticket, FetchOutcome)>,
        ticket: Ticket,
        request: TileRequest,
        permit: ConcurrencyPermit,
    ) {
        let client = Arc::clone(&self.client);
        let stats = Arc::clone(&self.stats);
        let timeout = self.fetch_timeout;

        tasks.spawn(async move {
            let _permit = permit;
            let outcome = fetch_one(client.as_ref(), &request, timeout).await;
            match &outcome {
                FetchOutcome::Success { bytes } => stats.record_success(*bytes),
                FetchOutcome::Failed(_) => stats.record_failure(),
            }
            (ticket, outcome)
        });
    }

    /// Waits up to `drain_timeout` for in-flight tasks, then aborts the rest.
    async fn drain(
        &self,
        tasks: &mut JoinSet<(Ticket, FetchOutcome)>,
        in_flight: &mut HashMap<Ticket, TileRequest>,
        report: &mut FetchReport,
    ) {
        let drained = tokio::time::timeout(self.drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                record(joined, in_flight, report);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                active = tasks.len(),
                timeout_secs = self.drain_timeout.as_secs(),
                "In-flight fetches did not finish in time, aborting"
            );
            tasks.abort_all();
            while let Some(joined) = tasks.join_next().await {
                record(joined, in_flight, report);
            }
        }
    }
}

/// Pairs a finished task with its request and logs the outcome.
fn record(
    joined: Result<(Ticket, FetchOutcome), JoinError>,
    in_flight: &mut HashMap<Ticket, TileRequest>,
    report: &mut FetchReport,
) {
    let (ticket, outcome) = match joined {
        Ok(done) => done,
        Err(join_err) => {
            // The request stays in `in_flight` and is reported as aborted.
            if !join_err.is_cancelled() {
                warn!(error = %join_err, "Fetch task panicked");
            }
            return;
        }
    };

    let Some(request) = in_flight.remove(&ticket) else {
        return;
    };

    match &outcome {
        FetchOutcome::Success { bytes } => {
            trace!(
                zoom = request.coord.zoom,
                x = request.coord.x,
                y = request.coord.y,
                bytes = bytes,
                "Tile fetched"
            );
        }
        FetchOutcome::Failed(failure) => {
            warn!(
                zoom = request.coord.zoom,
                x = request.coord.x,
                y = request.coord.y,
                url = %request.url,
                kind = failure.kind(),
                error = %failure,
                "Tile fetch failed"
            );
            if failure.is_filesystem() && report.fault.is_none() {
                report.fault = Some(failure.clone());
            }
        }
    }

    report.push(request, outcome);
}

/// One attempt: GET, validate, write.
async fn fetch_one<C: AsyncHttpClient>(
    client: &C,
    request: &TileRequest,
    timeout: Duration,
) -> FetchOutcome {
    let body = match tokio::time::timeout(timeout, client.get(&request.url)).await {
        Ok(Ok(body)) => body,
        Ok(Err(e)) => return FetchOutcome::Failed(e.into()),
        Err(_) => return FetchOutcome::Failed(FetchFailure::Timeout),
    };

    let validated = tokio::task::spawn_blocking(move || {
        let verdict = validate_image(&body);
        (body, verdict)
    })
    .await;

    let body = match validated {
        Ok((body, Ok(_))) => body,
        Ok((_, Err(failure))) => return FetchOutcome::Failed(failure),
        Err(e) => return FetchOutcome::Failed(FetchFailure::Decode(e.to_string())),
    };

    if let Err(e) = write_tile(&request.destination, &body).await {
        return FetchOutcome::Failed(FetchFailure::Filesystem {
            path: request.destination.clone(),
            reason: e.to_string(),
        });
    }

    FetchOutcome::Success { bytes: body.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::fetch::validate::sample_png;
    use crate::provider::{MockAsyncHttpClient, ProviderError};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn requests(root: &Path, zoom: u8) -> Vec<TileRequest> {
        let n = 1u32 << zoom;
        let mut out = Vec::new();
        for x in 0..n {
            for y in 0..n {
                let coord = TileCoord::new(zoom, x, y).unwrap();
                out.push(TileRequest::new(
                    coord,
                    format!("http://tiles.test/{}/{}/{}", zoom, x, y),
                    root.join(format!("{}/{}/{}.png", zoom, x, y)),
                ));
            }
        }
        out
    }

    /// Client that sleeps and records how many calls overlap.
    struct SlowClient {
        delay: Duration,
        current: AtomicUsize,
        peak: AtomicUsize,
        body: Vec<u8>,
    }

    impl SlowClient {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                body: sample_png(2, 2),
            }
        }
    }

    impl AsyncHttpClient for SlowClient {
        async fn get(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    #[tokio::test]
    async fn test_all_success_writes_every_tile() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAsyncHttpClient::always(Ok(sample_png(4, 4))));
        let fetcher = TileFetcher::new(client.clone());

        let report = fetcher
            .fetch_all(requests(temp.path(), 2), 4, &CancellationToken::new())
            .await;

        assert_eq!(report.len(), 16);
        assert_eq!(report.success_count(), 16);
        assert!(report.is_complete());
        assert_eq!(client.request_count(), 16);
        for (request, _) in &report.outcomes {
            assert!(request.destination.exists());
        }
        assert_eq!(fetcher.stats().snapshot().tiles_fetched, 16);
    }

    #[tokio::test]
    async fn test_failures_are_paired_with_their_requests() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(
            MockAsyncHttpClient::always(Ok(sample_png(4, 4)))
                .with_response(
                    "http://tiles.test/1/0/1",
                    Err(ProviderError::Status {
                        status: 404,
                        url: "http://tiles.test/1/0/1".into(),
                    }),
                )
                .with_response("http://tiles.test/1/1/0", Ok(b"<html>".to_vec())),
        );
        let fetcher = TileFetcher::new(client);

        let report = fetcher
            .fetch_all(requests(temp.path(), 1), 12, &CancellationToken::new())
            .await;

        assert_eq!(report.len(), 4);
        assert_eq!(report.success_count(), 2);
        for (request, outcome) in &report.outcomes {
            match (request.coord.x, request.coord.y) {
                (0, 1) => assert_eq!(outcome, &FetchOutcome::Failed(FetchFailure::Status(404))),
                (1, 0) => assert!(matches!(outcome, FetchOutcome::Failed(FetchFailure::Decode(_)))),
                _ => assert!(outcome.is_success()),
            }
            assert_eq!(request.destination.exists(), outcome.is_success());
        }
    }

    #[tokio::test]
    async fn test_concurrency_bound_respected() {
        for limit in [1usize, 4, 12] {
            let temp = TempDir::new().unwrap();
            let client = Arc::new(SlowClient::new(Duration::from_millis(10)));
            let fetcher = TileFetcher::new(client.clone());

            let report = fetcher
                .fetch_all(requests(temp.path(), 3), limit, &CancellationToken::new())
                .await;

            assert_eq!(report.success_count(), 64);
            assert!(client.peak.load(Ordering::SeqCst) <= limit);
            assert!(report.peak_in_flight <= limit);
        }
    }

    #[tokio::test]
    async fn test_timeout_is_per_fetch() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(SlowClient::new(Duration::from_secs(5)));
        let fetcher = TileFetcher::new(client).with_fetch_timeout(Duration::from_millis(20));

        let report = fetcher
            .fetch_all(requests(temp.path(), 1), 4, &CancellationToken::new())
            .await;

        assert_eq!(report.len(), 4);
        assert!(report
            .outcomes
            .iter()
            .all(|(_, o)| o == &FetchOutcome::Failed(FetchFailure::Timeout)));
    }

    #[tokio::test]
    async fn test_cancel_before_start_sends_nothing() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockAsyncHttpClient::always(Ok(sample_png(2, 2))));
        let fetcher = TileFetcher::new(client.clone());
        let token = CancellationToken::new();
        token.cancel();

        let report = fetcher.fetch_all(requests(temp.path(), 1), 4, &token).await;

        assert_eq!(report.len(), 4);
        assert_eq!(report.success_count(), 0);
        assert_eq!(client.request_count(), 0);
        assert!(report.cancelled);
        assert!(report
            .failures()
            .all(|(_, f)| f == &FetchFailure::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_drains_and_accounts_for_all() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(SlowClient::new(Duration::from_millis(50)));
        let fetcher = TileFetcher::new(client).with_drain_timeout(Duration::from_secs(5));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let report = fetcher.fetch_all(requests(temp.path(), 3), 4, &token).await;

        assert!(report.cancelled);
        assert_eq!(report.len(), 64);
        // The first wave was in flight and allowed to finish.
        assert_eq!(report.success_count(), 4);
        assert_eq!(
            report.failures().filter(|(_, f)| **f == FetchFailure::Cancelled).count(),
            60
        );
    }

    #[tokio::test]
    async fn test_drain_timeout_aborts_stragglers() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(SlowClient::new(Duration::from_secs(10)));
        let fetcher = TileFetcher::new(client)
            .with_fetch_timeout(Duration::from_secs(60))
            .with_drain_timeout(Duration::from_millis(20));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let report = fetcher.fetch_all(requests(temp.path(), 1), 2, &token).await;

        assert_eq!(report.len(), 4);
        let aborted = report
            .failures()
            .filter(|(_, f)| matches!(f, FetchFailure::Aborted(_)))
            .count();
        assert_eq!(aborted, 2);
        assert_eq!(
            report.failures().filter(|(_, f)| **f == FetchFailure::Cancelled).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_filesystem_failure_stops_submission() {
        let temp = TempDir::new().unwrap();
        // A file where the zoom directory should be makes every write fail.
        std::fs::write(temp.path().join("2"), b"").unwrap();
        let client = Arc::new(MockAsyncHttpClient::always(Ok(sample_png(2, 2))));
        let fetcher = TileFetcher::new(client.clone());

        let report = fetcher
            .fetch_all(requests(temp.path(), 2), 1, &CancellationToken::new())
            .await;

        assert_eq!(report.len(), 16);
        assert!(matches!(report.fault, Some(FetchFailure::Filesystem { .. })));
        assert!(!report.is_complete());
        assert_eq!(client.request_count(), 1);
        assert_eq!(
            report.failures().filter(|(_, f)| **f == FetchFailure::Cancelled).count(),
            15
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let client = Arc::new(MockAsyncHttpClient::always(Ok(Vec::new())));
        let fetcher = TileFetcher::new(client);
        let report = fetcher
            .fetch_all(Vec::new(), 12, &CancellationToken::new())
            .await;
        assert!(report.is_empty());
        assert!(report.is_complete());
    }
}
