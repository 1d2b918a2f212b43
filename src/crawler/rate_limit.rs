//! Global request spacing
//!
//! Every outbound request of the run passes through one [`RateLimiter`].
//! Callers are served one at a time; each is released no earlier than
//! `interval` after the previous caller was released. The requests
//! themselves then proceed concurrently.

use crate::crawler::monitor::Cancelled;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

/// Upper bound accepted for a robots.txt crawl delay
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(30);

/// Shared minimum-interval gate
#[derive(Debug)]
pub struct RateLimiter {
    interval_ms: AtomicU64,
    last_release: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: AtomicU64::new(interval.as_millis() as u64),
            last_release: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    /// Raises the interval to honor a site's crawl delay
    ///
    /// The interval never decreases; delays above [`MAX_CRAWL_DELAY`] are capped.
    pub fn raise_interval(&self, delay: Duration) {
        let delay = delay.min(MAX_CRAWL_DELAY).as_millis() as u64;
        let previous = self.interval_ms.fetch_max(delay, Ordering::Relaxed);
        if delay > previous {
            info!(
                "Request interval raised from {}ms to {}ms by crawl-delay",
                previous, delay
            );
        }
    }

    /// Waits for the next request slot
    ///
    /// # Returns
    ///
    /// * `Ok(Instant)` - The instant this caller was released
    /// * `Err(Cancelled)` - The run was cancelled while waiting
    pub async fn throttle(&self, cancel: &CancellationToken) -> Result<Instant, Cancelled> {
        let mut last = tokio::select! {
            guard = self.last_release.lock() => guard,
            _ = cancel.cancelled() => return Err(Cancelled),
        };

        if let Some(previous) = *last {
            let ready = previous + self.interval();
            if Instant::now() < ready {
                trace!("Throttling for {:?}", ready - Instant::now());
                tokio::select! {
                    _ = sleep_until(ready) => {}
                    _ = cancel.cancelled() => return Err(Cancelled),
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let released = Instant::now();
        *last = Some(released);
        Ok(released)
    }
}
