//! Inter-region pacing.
//!
//! Regions are fetched one after another with a pause in between; the pause
//! is the only rate limit applied to the tile server. It sits behind the
//! [`Pacer`] trait so tests run without waiting.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default pause between two fetched regions.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(240);

/// Decides how long to wait before the next region starts fetching.
pub trait Pacer: Send + Sync {
    /// Waits before the next region.
    ///
    /// Returns `false` if the wait was interrupted by cancellation.
    fn pause(&self, cancellation_token: &CancellationToken) -> impl Future<Output = bool> + Send;
}

/// Fixed cool-down, interruptible by cancellation.
#[derive(Debug, Clone, Copy)]
pub struct CooldownPacer {
    cooldown: Duration,
}

impl CooldownPacer {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for CooldownPacer {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl Pacer for CooldownPacer {
    async fn pause(&self, cancellation_token: &CancellationToken) -> bool {
        if self.cooldown.is_zero() {
            return !cancellation_token.is_cancelled();
        }

        info!(secs = self.cooldown.as_secs(), "Cooling down before next region");
        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => false,
            _ = tokio::time::sleep(self.cooldown) => true,
        }
    }
}

/// No pause at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediatePacer;

impl Pacer for ImmediatePacer {
    async fn pause(&self, cancellation_token: &CancellationToken) -> bool {
        !cancellation_token.is_cancelled()
    }
}
