//! Keyed one-shot timers for Throwdown.
//!
//! Rock-paper-scissors is turn-based, so there is no fixed-rate game loop.
//! The only timed behaviour is the reveal pause between "both moves are
//! in" and "results are sent". [`TimerSet`] runs that pause as a spawned
//! Tokio task per key (the room code), which can be cancelled when the
//! room disappears before it fires.
//!
//! # Integration
//!
//! The set lives next to the state it protects, behind the same lock:
//!
//! ```ignore
//! let mut state = lobby.lock().await;
//! state.timers.schedule(code.clone(), delay, async move {
//!     let mut state = lobby.lock().await;
//!     state.timers.complete(&code);
//!     /* resolve the round */
//! });
//! ```
//!
//! Because the fired task re-acquires the lock before touching anything,
//! a `cancel` issued while holding the lock is final: an aborted task that
//! was waiting on the lock never runs.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters describing what a [`TimerSet`] has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerMetrics {
    /// Timers handed to [`TimerSet::schedule`].
    pub scheduled: u64,
    /// Timers that reported back through [`TimerSet::complete`].
    pub fired: u64,
    /// Timers aborted by [`TimerSet::cancel`] or [`TimerSet::cancel_all`].
    pub cancelled: u64,
    /// Timers aborted because the same key was scheduled again.
    pub replaced: u64,
}

// ---------------------------------------------------------------------------
// TimerSet
// ---------------------------------------------------------------------------

struct PendingTimer {
    handle: JoinHandle<()>,
    deadline: Instant,
}

/// A set of pending one-shot timers, at most one per key.
///
/// Dropping the set aborts every timer still pending.
pub struct TimerSet<K> {
    pending: HashMap<K, PendingTimer>,
    metrics: TimerMetrics,
}

impl<K> TimerSet<K>
where
    K: Eq + Hash + Clone + fmt::Display,
{
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            metrics: TimerMetrics::default(),
        }
    }

    /// Runs `task` once `delay` has elapsed.
    ///
    /// If `key` already has a pending timer, that timer is aborted and
    /// replaced. Must be called from inside a Tokio runtime.
    pub fn schedule<F>(&mut self, key: K, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            task.await;
        });

        self.metrics.scheduled += 1;
        if let Some(previous) = self.pending.insert(key.clone(), PendingTimer { handle, deadline }) {
            previous.handle.abort();
            self.metrics.replaced += 1;
            warn!(%key, "timer rescheduled while still pending");
        }
        trace!(%key, delay_ms = delay.as_millis() as u64, "timer scheduled");
    }

    /// Aborts the pending timer for `key`.
    ///
    /// Returns `true` if there was one. A task that has already started
    /// running its body is stopped at its next await point.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some(timer) => {
                timer.handle.abort();
                self.metrics.cancelled += 1;
                debug!(%key, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Called by a fired timer to drop its bookkeeping entry.
    ///
    /// Does not abort anything: the caller is the timer's own task.
    /// Returns `false` if the entry was already cancelled or replaced.
    pub fn complete(&mut self, key: &K) -> bool {
        if self.pending.remove(key).is_some() {
            self.metrics.fired += 1;
            trace!(%key, "timer fired");
            true
        } else {
            false
        }
    }

    /// Aborts every pending timer. Returns how many were pending.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        for (_, timer) in self.pending.drain() {
            timer.handle.abort();
        }
        self.metrics.cancelled += count as u64;
        if count > 0 {
            debug!(count, "all timers cancelled");
        }
        count
    }

    /// Time left until `key` fires, or `None` if nothing is pending.
    pub fn remaining(&self, key: &K) -> Option<Duration> {
        self.pending
            .get(key)
            .map(|timer| timer.deadline.saturating_duration_since(Instant::now()))
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no timers are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> &TimerMetrics {
        &self.metrics
    }
}

impl<K> Default for TimerSet<K>
where
    K: Eq + Hash + Clone + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for TimerSet<K> {
    fn drop(&mut self) {
        for (_, timer) in self.pending.drain() {
            timer.handle.abort();
        }
    }
}
