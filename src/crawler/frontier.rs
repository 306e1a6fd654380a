//! URL frontier and visited set
//!
//! The frontier is a FIFO queue shared by all workers. Dedup, depth and page
//! budget checks happen in the same critical section as the push, so two
//! workers racing on one URL can never both enqueue it.

use crate::state::CrawlPhase;
use crate::url::canonicalize;
use crate::{Result, TidemarkError};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use url::Url;

/// A URL scheduled for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub url: Url,
    /// Link distance from the nearest seed; seeds are 0
    pub depth: u32,
    /// Page the URL was found on; `None` for seeds
    pub discovered_from: Option<Url>,
}

impl UrlRecord {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            discovered_from: None,
        }
    }

    /// Record for a link found on this page, one level deeper
    pub fn child(&self, url: Url) -> Self {
        Self {
            url,
            depth: self.depth + 1,
            discovered_from: Some(self.url.clone()),
        }
    }

    /// Record for a redirect target; keeps this record's depth
    pub fn redirect(&self, url: Url) -> Self {
        Self {
            url,
            depth: self.depth,
            discovered_from: Some(self.url.clone()),
        }
    }
}

/// Canonical keys of every URL ever enqueued in this run
///
/// Keys are only ever added.
#[derive(Debug, Default)]
pub struct VisitedSet {
    keys: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the URL's canonical key; false if it was already present
    pub fn insert(&mut self, url: &Url) -> bool {
        self.keys.insert(canonicalize(url))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug)]
struct Inner {
    queue: VecDeque<UrlRecord>,
    visited: VisitedSet,
    dequeued: usize,
    in_flight: usize,
    phase: CrawlPhase,
}

impl Inner {
    fn transition(&mut self, next: CrawlPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(TidemarkError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        if self.phase != next {
            tracing::debug!("Crawl phase {} -> {}", self.phase, next);
        }
        self.phase = next;
        Ok(())
    }
}

/// Shared FIFO work queue with termination detection
///
/// `dequeue` hands out at most `max_pages` records in total. It parks while the
/// queue is empty but other workers still hold records (they may discover more
/// links) and returns `None` for good once the queue is empty with nothing in
/// flight, the page budget is spent, or a stop was requested.
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<Inner>,
    notify: Notify,
    stopped: AtomicBool,
    max_depth: u32,
    max_pages: usize,
}

impl Frontier {
    pub fn new(max_depth: u32, max_pages: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                visited: VisitedSet::new(),
                dequeued: 0,
                in_flight: 0,
                phase: CrawlPhase::Running,
            }),
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
            max_depth,
            max_pages,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a record unless it is too deep, already seen, or the page budget is spent
    ///
    /// # Returns
    ///
    /// * `true` - The record was queued
    /// * `false` - The record was rejected
    pub fn enqueue(&self, record: UrlRecord) -> bool {
        if record.depth > self.max_depth {
            tracing::trace!("Depth {} exceeds limit: {}", record.depth, record.url);
            return false;
        }

        {
            let mut inner = self.lock();
            if inner.dequeued >= self.max_pages || !inner.phase.accepts_work() {
                return false;
            }
            if !inner.visited.insert(&record.url) {
                return false;
            }
            inner.queue.push_back(record);
        }

        self.notify.notify_waiters();
        true
    }

    /// Takes the next record, waiting while other workers may still add work
    ///
    /// Every `Some` must be matched by one [`Frontier::complete`] call, usually
    /// through an [`InFlightGuard`].
    pub async fn dequeue(&self) -> Option<UrlRecord> {
        loop {
            // registered before the state check so no wakeup is missed
            let notified = self.notify.notified();

            {
                let mut inner = self.lock();

                if self.stopped.load(Ordering::SeqCst) || inner.dequeued >= self.max_pages {
                    let _ = inner.transition(CrawlPhase::Draining);
                    return None;
                }

                if let Some(record) = inner.queue.pop_front() {
                    inner.dequeued += 1;
                    inner.in_flight += 1;
                    return Some(record);
                }

                if inner.in_flight == 0 {
                    let _ = inner.transition(CrawlPhase::Draining);
                    drop(inner);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks a dequeued record as fully processed
    pub fn complete(&self) {
        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    /// Requests early shutdown; in-flight records still finish
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::info!("Stop requested, draining workers");
        }
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Marks the run stopped once every worker has exited
    pub fn finish(&self) -> Result<()> {
        self.lock().transition(CrawlPhase::Stopped)
    }

    pub fn phase(&self) -> CrawlPhase {
        self.lock().phase
    }

    /// Records handed out so far
    pub fn pages_dequeued(&self) -> usize {
        self.lock().dequeued
    }

    /// Records waiting in the queue
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }
}

/// Calls [`Frontier::complete`] when dropped
pub struct InFlightGuard<'a> {
    frontier: &'a Frontier,
}

impl<'a> InFlightGuard<'a> {
    pub fn new(frontier: &'a Frontier) -> Self {
        Self { frontier }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.frontier.complete();
    }
}

/// Cloneable handle for stopping a running crawl from outside
#[derive(Debug, Clone)]
pub struct StopHandle {
    frontier: Arc<Frontier>,
}

impl StopHandle {
    pub(crate) fn new(frontier: Arc<Frontier>) -> Self {
        Self { frontier }
    }

    /// Requests shutdown: no new records are handed out, in-flight fetches finish
    pub fn stop(&self) {
        self.frontier.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.frontier.is_stopped()
    }
}
