//! Crawl frontier: FIFO queue, dedup set and page budget
//!
//! The frontier owns every URL decision made during a run:
//! - scope (same host as the base URL)
//! - deduplication by normalized URL
//! - the `max-pages` admission budget
//! - breadth-first hand-out order
//!
//! Workers block in [`Frontier::next`] until a task is available. The run
//! ends once the queue is empty and no task is in flight, because only an
//! in-flight task can discover new URLs.

use crate::url::DomainScope;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

/// A URL admitted to the frontier
#[derive(Debug, Clone)]
pub struct UrlTask {
    /// Normalized URL, also the dedup key
    pub url: Url,

    /// Link distance from the base URL
    pub depth: u32,

    /// Page the link was found on (`None` for the base URL)
    pub discovered_from: Option<Url>,

    /// Discovery sequence number; the document is ordered by it
    pub seq: u64,
}

/// Outcome of an enqueue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    OutOfDomain,
    Duplicate,
    OverBudget,
    Closed,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<UrlTask>,
    seen: HashSet<String>,
    in_flight: BTreeMap<u64, Url>,
    next_seq: u64,
    closed: bool,
}

/// Shared FIFO frontier with dedup
pub struct Frontier {
    scope: DomainScope,
    max_pages: usize,
    state: Mutex<FrontierState>,
    notify: Notify,
    cancel: CancellationToken,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `scope` - The crawl domain
    /// * `max_pages` - Maximum number of URLs ever admitted
    /// * `cancel` - Run-wide cancellation; once fired no further task is handed out
    pub fn new(scope: DomainScope, max_pages: usize, cancel: CancellationToken) -> Self {
        Self {
            scope,
            max_pages,
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
            cancel,
        }
    }

    fn state(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offers a URL to the frontier
    ///
    /// The URL is normalized and coerced to the base scheme before the
    /// dedup check, so spelling variants of one page collapse into one task.
    pub fn enqueue(&self, url: &Url, depth: u32, from: Option<&Url>) -> Admission {
        if self.cancel.is_cancelled() {
            return Admission::Closed;
        }

        let Some(normalized) = self.scope.admit(url) else {
            return Admission::OutOfDomain;
        };

        let mut state = self.state();
        if state.closed {
            return Admission::Closed;
        }
        if state.seen.contains(normalized.as_str()) {
            return Admission::Duplicate;
        }
        if state.seen.len() >= self.max_pages {
            return Admission::OverBudget;
        }

        state.seen.insert(normalized.to_string());
        let seq = state.next_seq;
        state.next_seq += 1;

        trace!("Admitted #{} {} (depth {})", seq, normalized, depth);
        state.queue.push_back(UrlTask {
            url: normalized,
            depth,
            discovered_from: from.cloned(),
            seq,
        });
        drop(state);

        self.notify.notify_waiters();
        Admission::Admitted
    }

    /// Waits for the next task
    ///
    /// # Returns
    ///
    /// * `Some(UrlTask)` - The oldest pending task, now marked in flight
    /// * `None` - The frontier is closed, the run was cancelled, or the
    ///   queue is drained with nothing left in flight
    pub async fn next(&self) -> Option<UrlTask> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a concurrent wake-up is not lost
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if state.closed || self.cancel.is_cancelled() {
                    return None;
                }

                if let Some(task) = state.queue.pop_front() {
                    state.in_flight.insert(task.seq, task.url.clone());
                    return Some(task);
                }

                if state.in_flight.is_empty() {
                    debug!("Frontier drained, closing");
                    state.closed = true;
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.cancel.cancelled() => return None,
            }
        }
    }

    /// Marks a task as finished
    ///
    /// Must be called after the task's discovered links were enqueued.
    pub fn complete(&self, task: &UrlTask) {
        self.state().in_flight.remove(&task.seq);
        self.notify.notify_waiters();
    }

    /// Stops handing out and admitting tasks
    pub fn close(&self) {
        self.state().closed = true;
        self.notify.notify_waiters();
    }

    /// Closes the frontier and discards the tasks that were never handed out
    ///
    /// Returns how many were discarded. On an aborted run these are admitted
    /// pages that no worker will process.
    pub fn drain_pending(&self) -> usize {
        let mut state = self.state();
        state.closed = true;
        let drained = state.queue.len();
        state.queue.clear();
        drop(state);

        self.notify.notify_waiters();
        drained
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Number of tasks waiting to be handed out
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }

    /// Number of URLs admitted so far
    pub fn admitted(&self) -> usize {
        self.state().seen.len()
    }

    /// URLs currently being processed, in discovery order
    pub fn in_flight_urls(&self) -> Vec<String> {
        self.state()
            .in_flight
            .values()
            .map(|url| url.to_string())
            .collect()
    }
}
