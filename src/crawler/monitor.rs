//! Progress monitoring and run shutdown
//!
//! A run ends early for one of three reasons: the first pages look like a
//! JavaScript-only site, no page made progress for `stall-timeout`, or the
//! user interrupted the process. All three funnel through [`Shutdown`], a
//! cloneable handle around one cancellation token. The first reason
//! recorded wins; later triggers are ignored.

use crate::crawler::frontier::Frontier;
use crate::crawler::rate_limit::RateLimiter;
use crate::extract::SpaReport;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Returned by waits that were cut short by shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("crawl cancelled")]
pub struct Cancelled;

/// Why a run was aborted
#[derive(Debug, Clone)]
pub enum AbortReason {
    /// The site renders its content client-side
    Spa(SpaReport),

    /// No progress within the stall timeout
    Stall {
        idle: Duration,
        in_flight: Vec<String>,
    },

    /// User interrupt (Ctrl-C)
    Interrupted,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spa(report) => write!(
                f,
                "single-page application detected at {} ({} of 5 indicators: {})",
                report.url,
                report.fired(),
                report.fired_names().join(", ")
            ),
            Self::Stall { idle, in_flight } => write!(
                f,
                "no progress for {:.1}s with {} page(s) in flight",
                idle.as_secs_f64(),
                in_flight.len()
            ),
            Self::Interrupted => write!(f, "interrupted by user"),
        }
    }
}

/// Run-wide shutdown handle
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    reason: Arc<Mutex<Option<AbortReason>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// The token observed by every suspension point of the run
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Records an abort reason and cancels the run
    ///
    /// # Returns
    ///
    /// `true` if this call decided the abort reason
    pub fn trigger(&self, reason: AbortReason) -> bool {
        let mut slot = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(reason);
        drop(slot);
        self.token.cancel();
        true
    }

    /// Requests a graceful stop on behalf of the user
    pub fn interrupt(&self) -> bool {
        self.trigger(AbortReason::Interrupted)
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Time of the last unit of progress
#[derive(Debug)]
pub struct ProgressClock {
    last: Mutex<Instant>,
}

impl ProgressClock {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(Instant::now()),
        }
    }

    /// Records progress now
    pub fn tick(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Time since the last tick
    pub fn idle(&self) -> Duration {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

impl Default for ProgressClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the background stall watcher
///
/// The watcher polls the clock a few times per timeout period and triggers
/// [`AbortReason::Stall`] once the idle time reaches `timeout` plus the
/// current request interval. A worker queued in the rate limiter waits up to
/// one interval for its slot; that wait is not a stall. The watcher exits as
/// soon as the run is shut down for any reason.
pub fn spawn_stall_watcher(
    clock: Arc<ProgressClock>,
    frontier: Arc<Frontier>,
    limiter: Arc<RateLimiter>,
    timeout: Duration,
    shutdown: Shutdown,
) -> JoinHandle<()> {
    let poll = (timeout / 4).clamp(Duration::from_millis(50), Duration::from_secs(1));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(poll) => {}
            }

            let idle = clock.idle();
            if idle < stall_threshold(timeout, limiter.interval()) {
                continue;
            }

            let in_flight = frontier.in_flight_urls();
            error!(
                "Crawl stalled: no progress for {:.1}s ({} pending, {} in flight)",
                idle.as_secs_f64(),
                frontier.pending(),
                in_flight.len()
            );
            for url in &in_flight {
                warn!("  still in flight: {}", url);
            }

            shutdown.trigger(AbortReason::Stall { idle, in_flight });
            return;
        }
    })
}

/// Idle time after which the run counts as stalled
fn stall_threshold(timeout: Duration, request_interval: Duration) -> Duration {
    timeout + request_interval
}

/// Spawns a listener that turns Ctrl-C into a graceful abort
pub fn spawn_interrupt_listener(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => {
                        info!("Interrupt received, finishing in-flight pages");
                        shutdown.interrupt();
                    }
                    Err(e) => warn!("Unable to listen for interrupt signal: {}", e),
                }
            }
        }
    })
}
