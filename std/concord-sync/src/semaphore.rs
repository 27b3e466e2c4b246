//!
//! Counting Semaphore
//!
//! Classic Dijkstra semaphore. The counter may go negative; its magnitude
//! is then the number of blocked callers. Every `signal` that finds the
//! counter negative hands out exactly one wakeup, and every blocked `wait`
//! consumes exactly one, so spurious condvar wakeups never release a caller.
//!

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct SemState {
    value: i64,
    wakeups: u64,
}

pub struct Semaphore {
    state: Mutex<SemState>,
    cond: Condvar,
}

impl Semaphore {
    pub fn new(value: i64) -> Self {
        Self {
            state: Mutex::new(SemState { value, wakeups: 0 }),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SemState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment the counter. If it was negative, one blocked caller is released.
    pub fn signal(&self) {
        let mut state = self.lock();
        let previous = state.value;
        state.value += 1;
        if previous < 0 {
            state.wakeups += 1;
            self.cond.notify_one();
        }
    }

    /// Decrement the counter, blocking until a matching `signal` if it was not positive.
    pub fn wait(&self) {
        let mut state = self.lock();
        state.value -= 1;
        if state.value >= 0 {
            return;
        }
        while state.wakeups == 0 {
            state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.wakeups -= 1;
    }

    /// Like `wait`, but gives up after `timeout`. Returns false on timeout,
    /// in which case the counter is restored as if `wait` was never called.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        state.value -= 1;
        if state.value >= 0 {
            return true;
        }
        loop {
            if state.wakeups > 0 {
                state.wakeups -= 1;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                state.value += 1;
                return false;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Decrement only if that would not block
    pub fn try_wait(&self) -> bool {
        let mut state = self.lock();
        if state.value > 0 {
            state.value -= 1;
            true
        } else {
            false
        }
    }

    pub fn value(&self) -> i64 {
        self.lock().value
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore").field("value", &self.value()).finish()
    }
}
