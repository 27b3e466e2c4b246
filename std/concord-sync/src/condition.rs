//!
//! Rank-Ordered Condition Variable
//!
//! Waiters are queued by a caller-supplied rank instead of arrival order:
//! `signal` always releases the lowest rank present, so a monitor body can
//! say "wake whoever's deadline is soonest" by passing the deadline as the
//! rank. Equal ranks are released in arrival order.
//!
//! Each waiter blocks on its own release semaphore. Enqueueing the record
//! and releasing the monitor mutex happen under the queue lock, so a
//! `signal` issued after the monitor mutex becomes free always sees the
//! waiter.
//!
//! Every wait must sit inside a loop that re-checks its predicate:
//!
//! ```rust,ignore
//! while state.is_full() {
//!     state.not_full.wait(0)?;
//! }
//! ```
//!

use std::collections::BTreeMap;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use concord_core::diagnostics::{self, TraceEvent};

use crate::errors::SyncError;
use crate::mutex::Mutex;
use crate::semaphore::Semaphore;

pub type Rank = u32;

/// Returned by `minrank` when nobody is waiting
pub const RANK_INFINITE: Rank = Rank::MAX;

#[derive(Default)]
struct WaitQueue {
    waiters: BTreeMap<(Rank, u64), Arc<Semaphore>>,
    next_seq: u64,
}

impl WaitQueue {
    fn push(&mut self, rank: Rank, token: Arc<Semaphore>) -> (Rank, u64) {
        let key = (rank, self.next_seq);
        self.next_seq += 1;
        self.waiters.insert(key, token);
        key
    }
}

pub struct RankedCondition {
    monitor_mutex: Arc<Mutex>,
    queue: std::sync::Mutex<WaitQueue>,
}

impl RankedCondition {
    /// Conditions are only created through a monitor's `CondFactory`
    pub(crate) fn new(monitor_mutex: Arc<Mutex>) -> Self {
        Self {
            monitor_mutex,
            queue: std::sync::Mutex::new(WaitQueue::default()),
        }
    }

    fn queue(&self) -> MutexGuard<'_, WaitQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a record and release the monitor mutex in one step
    fn enqueue(&self, rank: Rank) -> Result<((Rank, u64), Arc<Semaphore>), SyncError> {
        if !self.monitor_mutex.held_by_current_thread() {
            return Err(SyncError::NotOwner);
        }
        let token = Arc::new(Semaphore::new(0));
        let mut queue = self.queue();
        let key = queue.push(rank, Arc::clone(&token));
        self.monitor_mutex.unlock()?;
        drop(queue);
        diagnostics::emit(&TraceEvent::ConditionBlocked { rank });
        Ok((key, token))
    }

    /// Block until signalled. Must be called with the monitor mutex held;
    /// it is released while blocked and re-acquired before returning.
    pub fn wait(&self, rank: Rank) -> Result<(), SyncError> {
        let (_, token) = self.enqueue(rank)?;
        token.wait();
        diagnostics::emit(&TraceEvent::ConditionReleased { rank });
        self.monitor_mutex.lock()
    }

    /// Bounded `wait`. Returns false if the timeout elapsed first; the
    /// waiter's record is withdrawn so it cannot absorb a later signal.
    pub fn wait_timeout(&self, rank: Rank, timeout: Duration) -> Result<bool, SyncError> {
        let (key, token) = self.enqueue(rank)?;
        let mut released = token.wait_timeout(timeout);
        if !released {
            let withdrawn = self.queue().waiters.remove(&key).is_some();
            if !withdrawn {
                // a signal popped the record before we could withdraw it
                token.wait();
                released = true;
            }
        }
        if released {
            diagnostics::emit(&TraceEvent::ConditionReleased { rank });
        }
        self.monitor_mutex.lock()?;
        Ok(released)
    }

    /// Release the lowest-ranked waiter, if any
    pub fn signal(&self) {
        if let Some((_, token)) = self.queue().waiters.pop_first() {
            token.signal();
        }
    }

    /// Release every queued waiter in rank order. The released waiters
    /// re-acquire the monitor mutex on their own, so it may already be taken
    /// by one of them by the time the signalling monitor call returns.
    pub fn signal_all(&self) {
        let mut queue = self.queue();
        while let Some((_, token)) = queue.waiters.pop_first() {
            token.signal();
        }
    }

    /// Smallest queued rank, or `RANK_INFINITE` when empty
    pub fn minrank(&self) -> Rank {
        self.queue()
            .waiters
            .first_key_value()
            .map(|((rank, _), _)| *rank)
            .unwrap_or(RANK_INFINITE)
    }

    pub fn is_empty(&self) -> bool {
        self.queue().waiters.is_empty()
    }

    /// True when at least one waiter is queued
    pub fn has_waiters(&self) -> bool {
        !self.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue().waiters.len()
    }
}

impl std::fmt::Debug for RankedCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankedCondition")
            .field("waiters", &self.len())
            .field("minrank", &self.minrank())
            .finish()
    }
}
