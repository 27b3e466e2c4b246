//!
//! Mutex Implementation for concord
//!
//! A binary semaphore with owner tracking. `lock` is `wait`, `unlock` is
//! `signal`. The mutex guards no data of its own; monitors and atomics pair
//! it with the state they protect.
//!
//! Usage:
//! ```rust,ignore
//! let m = Mutex::new();
//! {
//!     let _guard = m.guard()?;
//!     // critical section
//! }
//! ```
//!
//! Not re-entrant: a thread that already holds the mutex gets
//! `SyncError::RecursiveLock` from `lock` instead of deadlocking.
//!

use std::sync::PoisonError;
use std::thread::{self, ThreadId};

use crate::errors::{current_thread_label, SyncError};
use crate::semaphore::Semaphore;

pub struct Mutex {
    sem: Semaphore,
    owner: std::sync::Mutex<Option<ThreadId>>,
}

impl Mutex {
    pub fn new() -> Self {
        Self {
            sem: Semaphore::new(1),
            owner: std::sync::Mutex::new(None),
        }
    }

    fn owner(&self) -> Option<ThreadId> {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_owner(&self, owner: Option<ThreadId>) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = owner;
    }

    pub fn lock(&self) -> Result<(), SyncError> {
        let me = thread::current().id();
        if self.owner() == Some(me) {
            return Err(SyncError::RecursiveLock {
                thread: current_thread_label(),
            });
        }
        self.sem.wait();
        self.set_owner(Some(me));
        Ok(())
    }

    pub fn try_lock(&self) -> Result<bool, SyncError> {
        let me = thread::current().id();
        if self.owner() == Some(me) {
            return Err(SyncError::RecursiveLock {
                thread: current_thread_label(),
            });
        }
        if self.sem.try_wait() {
            self.set_owner(Some(me));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn unlock(&self) -> Result<(), SyncError> {
        {
            let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
            if *owner != Some(thread::current().id()) {
                return Err(SyncError::NotOwner);
            }
            *owner = None;
        }
        self.sem.signal();
        Ok(())
    }

    /// Lock and return a guard that unlocks on drop
    pub fn guard(&self) -> Result<MutexGuard<'_>, SyncError> {
        self.lock()?;
        Ok(MutexGuard {
            mutex: self,
            _not_send: std::marker::PhantomData,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.owner().is_some()
    }

    pub fn held_by_current_thread(&self) -> bool {
        self.owner() == Some(thread::current().id())
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutex").field("locked", &self.is_locked()).finish()
    }
}

/// Releases the mutex when dropped, including during unwinding
pub struct MutexGuard<'a> {
    mutex: &'a Mutex,
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        let _ = self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn test_mutex_basic() {
        let m = Mutex::new();
        assert!(!m.is_locked());

        m.lock().unwrap();
        assert!(m.is_locked());
        assert!(m.held_by_current_thread());

        m.unlock().unwrap();
        assert!(!m.is_locked());
        assert_eq!(m.unlock(), Err(SyncError::NotOwner));
    }

    #[test]
    fn test_recursive_lock_is_reported() {
        let m = Mutex::new();
        let _guard = m.guard().unwrap();
        assert!(matches!(m.lock(), Err(SyncError::RecursiveLock { .. })));
        assert!(matches!(m.try_lock(), Err(SyncError::RecursiveLock { .. })));
    }

    #[test]
    fn test_unlock_from_other_thread_rejected() {
        let m = Arc::new(Mutex::new());
        m.lock().unwrap();
        let other = Arc::clone(&m);
        let result = std::thread::spawn(move || other.unlock()).join().unwrap();
        assert_eq!(result, Err(SyncError::NotOwner));
        assert!(m.held_by_current_thread());
        m.unlock().unwrap();
    }

    #[test]
    fn test_mutex_concurrent() {
        let m = Arc::new(Mutex::new());
        let value = Arc::new(AtomicI64::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = Arc::clone(&m);
                let value = Arc::clone(&value);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let _guard = m.guard().unwrap();
                        // split load/store only stays consistent under the mutex
                        let current = value.load(Ordering::Relaxed);
                        std::thread::yield_now();
                        value.store(current + 1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(value.load(Ordering::SeqCst), 1000);
        assert!(!m.is_locked());
    }
}
