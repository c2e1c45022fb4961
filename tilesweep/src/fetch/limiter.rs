//! Semaphore-based limiter for concurrent tile fetches.
//!
//! Permits are owned, so they can move into spawned tasks and are released
//! when the task finishes (or is aborted).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Concurrency limiter with in-flight and peak accounting.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    /// Semaphore controlling concurrent operations
    semaphore: Arc<Semaphore>,

    /// Maximum permits (for stats/debugging)
    max_permits: usize,

    /// Current number of in-flight operations
    in_flight: Arc<AtomicUsize>,

    /// Peak concurrent operations observed
    peak_in_flight: Arc<AtomicUsize>,

    /// Label for this limiter (e.g., "tile_fetch")
    label: String,
}

impl ConcurrencyLimiter {
    /// Creates a new limiter. A limit of 0 is raised to 1.
    pub fn new(max_concurrent: usize, label: impl Into<String>) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_permits: max_concurrent,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            label: label.into(),
        }
    }

    /// Tries to acquire a permit without waiting.
    ///
    /// Returns `None` if no permits are available.
    pub fn try_acquire(&self) -> Option<ConcurrencyPermit> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.update_peak(current);

        Some(ConcurrencyPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Updates the peak counter if current exceeds it.
    fn update_peak(&self, current: usize) {
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A permit for one fetch. Released on drop.
#[derive(Debug)]
pub struct ConcurrencyPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ConcurrencyPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_limiter() {
        let limiter = ConcurrencyLimiter::new(12, "tile_fetch");
        assert_eq!(limiter.max_concurrent(), 12);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.available_permits(), 12);
        assert_eq!(limiter.label(), "tile_fetch");
    }

    #[test]
    fn test_zero_is_raised_to_one() {
        let limiter = ConcurrencyLimiter::new(0, "test");
        assert_eq!(limiter.max_concurrent(), 1);
    }

    #[test]
    fn test_try_acquire_exhausts_and_releases() {
        let limiter = ConcurrencyLimiter::new(1, "test");

        let permit1 = limiter.try_acquire();
        assert!(permit1.is_some());
        assert_eq!(limiter.in_flight(), 1);
        assert!(limiter.try_acquire().is_none());

        drop(permit1);
        assert_eq!(limiter.in_flight(), 0);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn test_peak_tracking() {
        let limiter = ConcurrencyLimiter::new(10, "test");

        let p1 = limiter.try_acquire();
        let p2 = limiter.try_acquire();
        let p3 = limiter.try_acquire();
        assert_eq!(limiter.peak_in_flight(), 3);

        drop(p3);
        drop(p2);
        assert_eq!(limiter.peak_in_flight(), 3);
        assert_eq!(limiter.in_flight(), 1);
        drop(p1);
    }

    #[tokio::test]
    async fn test_permit_moves_into_task() {
        let limiter = ConcurrencyLimiter::new(2, "test");
        let permit = limiter.try_acquire().unwrap();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        });
        assert_eq!(limiter.in_flight(), 1);

        handle.await.unwrap();
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.available_permits(), 2);
    }
}
