//!
//! Monitor Wrapper
//!
//! `Monitor<T>` owns one `Mutex` and one payload. Every call made through
//! `enter` or `with` runs with the mutex held from entry to exit, including
//! early returns and panics, because the guard releases it on drop.
//!
//! The payload is built by a closure that receives the monitor's
//! `CondFactory`; every `RankedCondition` it creates shares the monitor's
//! mutex, so a wait inside a payload method releases exactly that mutex.
//!
//! ## Payload state
//!
//! Other threads enter the monitor while a payload method is blocked in a
//! condition wait, so the payload is only ever reached through `&T`. Keep
//! mutable state in `Cell`/`RefCell` and never hold a `RefCell` borrow
//! across a `wait`.
//!
//! ```rust,ignore
//! struct Counter {
//!     value: Cell<u32>,
//!     positive: RankedCondition,
//! }
//!
//! let counter = Monitor::new(|conds| Counter {
//!     value: Cell::new(0),
//!     positive: conds.condition(),
//! });
//! counter.with(|c| c.value.set(c.value.get() + 1))?;
//! ```
//!
//! A payload that itself enters another monitor can deadlock against a
//! thread entering them in the opposite order; lock ordering across nested
//! monitors is the caller's responsibility.
//!

use std::ops::Deref;
use std::sync::Arc;

use concord_core::diagnostics::{self, TraceEvent};

use crate::condition::RankedCondition;
use crate::errors::SyncError;
use crate::mutex::Mutex;

/// Hands out conditions bound to one monitor's mutex
pub struct CondFactory {
    mutex: Arc<Mutex>,
}

impl CondFactory {
    pub fn condition(&self) -> RankedCondition {
        RankedCondition::new(Arc::clone(&self.mutex))
    }
}

/// Payload types that can build themselves from a condition factory
pub trait Monitorable {
    fn create(conds: &CondFactory) -> Self;
}

pub struct Monitor<T> {
    mutex: Arc<Mutex>,
    payload: T,
}

// The payload is only reachable through the monitor mutex (or the unsafe
// unguarded accessor), so sharing the monitor only requires moving T.
unsafe impl<T: Send> Sync for Monitor<T> {}

impl<T> Monitor<T> {
    pub fn new<F>(build: F) -> Self
    where
        F: FnOnce(&CondFactory) -> T,
    {
        let mutex = Arc::new(Mutex::new());
        let factory = CondFactory {
            mutex: Arc::clone(&mutex),
        };
        let payload = build(&factory);
        Self { mutex, payload }
    }

    /// Lock the monitor for the lifetime of the returned guard
    pub fn enter(&self) -> Result<MonitorGuard<'_, T>, SyncError> {
        diagnostics::emit(&TraceEvent::MonitorLocking);
        self.mutex.lock()?;
        diagnostics::emit(&TraceEvent::MonitorLocked);
        Ok(MonitorGuard {
            monitor: self,
            _not_send: std::marker::PhantomData,
        })
    }

    /// Run one operation on the payload with the mutex held
    pub fn with<R, F>(&self, f: F) -> Result<R, SyncError>
    where
        F: FnOnce(&T) -> R,
    {
        let guard = self.enter()?;
        Ok(f(&*guard))
    }

    /// Payload access without locking, for read-only diagnostics.
    ///
    /// # Safety
    ///
    /// The caller must ensure no other thread is inside the monitor, or that
    /// the payload state read here tolerates concurrent mutation.
    pub unsafe fn get_unguarded(&self) -> &T {
        &self.payload
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    pub fn into_inner(self) -> T {
        self.payload
    }

    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }
}

impl<T: Clone> Monitor<T> {
    /// Clone the payload under the mutex
    pub fn get_copy(&self) -> Result<T, SyncError> {
        self.with(T::clone)
    }
}

impl<T: Monitorable> Default for Monitor<T> {
    fn default() -> Self {
        Self::new(T::create)
    }
}

impl<T> std::fmt::Debug for Monitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// Holds the monitor mutex; unlocks on drop
pub struct MonitorGuard<'a, T> {
    monitor: &'a Monitor<T>,
    _not_send: std::marker::PhantomData<*const ()>,
}

impl<T> Deref for MonitorGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.monitor.payload
    }
}

impl<T> Drop for MonitorGuard<'_, T> {
    fn drop(&mut self) {
        if self.monitor.mutex.unlock().is_ok() {
            diagnostics::emit(&TraceEvent::MonitorUnlocked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::thread;
    use std::time::Duration;

    struct Gate {
        open: Cell<bool>,
        passed: Cell<u32>,
        opened: RankedCondition,
    }

    impl Monitorable for Gate {
        fn create(conds: &CondFactory) -> Self {
            Self {
                open: Cell::new(false),
                passed: Cell::new(0),
                opened: conds.condition(),
            }
        }
    }

    impl Gate {
        fn pass(&self) -> Result<(), SyncError> {
            while !self.open.get() {
                self.opened.wait(0)?;
            }
            self.passed.set(self.passed.get() + 1);
            Ok(())
        }

        fn open(&self) {
            self.open.set(true);
            self.opened.signal_all();
        }
    }

    #[test]
    fn test_with_locks_and_unlocks() {
        let gate: Monitor<Gate> = Monitor::default();
        let locked_inside = gate.with(|_| true).unwrap();
        assert!(locked_inside);
        assert!(!gate.is_locked());
    }

    #[test]
    fn test_nested_enter_is_reported() {
        let gate: Monitor<Gate> = Monitor::default();
        let _outer = gate.enter().unwrap();
        assert!(matches!(gate.enter(), Err(SyncError::RecursiveLock { .. })));
    }

    #[test]
    fn test_panic_inside_monitor_releases_mutex() {
        let gate: Arc<Monitor<Gate>> = Arc::new(Monitor::default());
        let inner = Arc::clone(&gate);
        let result = thread::spawn(move || {
            let _: () = inner.with(|_| panic!("payload failure")).unwrap();
        })
        .join();
        assert!(result.is_err());
        assert!(!gate.is_locked());
        gate.with(|g| g.passed.get()).unwrap();
    }

    #[test]
    fn test_waiters_release_mutex_while_blocked() {
        let gate: Arc<Monitor<Gate>> = Arc::new(Monitor::default());

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.enter().unwrap().pass().unwrap())
            })
            .collect();

        while gate.with(|g| g.opened.len()).unwrap() < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        gate.enter().unwrap().open();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(gate.with(|g| g.passed.get()).unwrap(), 3);
    }

    #[test]
    fn test_get_copy_and_into_inner() {
        let mut monitor = Monitor::new(|_| vec![1, 2, 3]);
        assert_eq!(monitor.get_copy().unwrap(), vec![1, 2, 3]);
        monitor.get_mut().push(4);
        assert_eq!(unsafe { monitor.get_unguarded() }.len(), 4);
        assert_eq!(monitor.into_inner(), vec![1, 2, 3, 4]);
    }
}
