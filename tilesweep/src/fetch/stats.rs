//! Session-wide fetch statistics.
//!
//! Accumulated from every fetch task across all regions of a run and read
//! once per region for logging.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Thread-safe counters shared by all fetch tasks.
#[derive(Debug)]
pub struct FetchStats {
    tiles_fetched: AtomicU64,
    tiles_failed: AtomicU64,
    bytes_downloaded: AtomicU64,
    started: Instant,
}

impl FetchStats {
    pub fn new() -> Self {
        Self {
            tiles_fetched: AtomicU64::new(0),
            tiles_failed: AtomicU64::new(0),
            bytes_downloaded: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_success(&self, bytes: usize) {
        self.tiles_fetched.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.tiles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            tiles_fetched: self.tiles_fetched.load(Ordering::Relaxed),
            tiles_failed: self.tiles_failed.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }
}

impl Default for FetchStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`FetchStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchStatsSnapshot {
    pub tiles_fetched: u64,
    pub tiles_failed: u64,
    pub bytes_downloaded: u64,
    pub elapsed: Duration,
}

impl FetchStatsSnapshot {
    /// Average download rate over the whole session, in bytes per second.
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_downloaded as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for FetchStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles fetched, {} failed, {:.1} MB in {:.0}s",
            self.tiles_fetched,
            self.tiles_failed,
            self.bytes_downloaded as f64 / 1_048_576.0,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = FetchStats::new();
        stats.record_success(1024);
        stats.record_success(2048);
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.tiles_fetched, 2);
        assert_eq!(snap.tiles_failed, 1);
        assert_eq!(snap.bytes_downloaded, 3072);
    }

    #[test]
    fn test_display() {
        let snap = FetchStatsSnapshot {
            tiles_fetched: 3,
            tiles_failed: 1,
            bytes_downloaded: 2 * 1_048_576,
            elapsed: Duration::from_secs(4),
        };
        assert_eq!(snap.to_string(), "3 tiles fetched, 1 failed, 2.0 MB in 4s");
        assert_eq!(snap.bytes_per_sec(), 524_288.0);
    }
}
