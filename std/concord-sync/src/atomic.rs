//!
//! Atomic Wrapper for concord
//!
//! `Atomic<T>` makes every access to a plain value mutually exclusive. It is
//! a monitor without condition variables: since nothing can block while the
//! lock is held, the guard can hand out `&mut T` directly.
//!
//! Usage:
//! ```rust,ignore
//! let counter = Atomic::new(0u64);
//! counter.with(|n| *n += 10)?;
//! let snapshot = counter.get_copy()?;
//! ```
//!

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};

use concord_core::diagnostics::{self, TraceEvent};

use crate::errors::SyncError;
use crate::mutex::Mutex;

pub struct Atomic<T> {
    mutex: Mutex,
    value: UnsafeCell<T>,
}

// Access to `value` is serialized by `mutex`.
unsafe impl<T: Send> Sync for Atomic<T> {}

impl<T> Atomic<T> {
    pub fn new(value: T) -> Self {
        Self {
            mutex: Mutex::new(),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> Result<AtomicGuard<'_, T>, SyncError> {
        diagnostics::emit(&TraceEvent::MonitorLocking);
        self.mutex.lock()?;
        diagnostics::emit(&TraceEvent::MonitorLocked);
        Ok(AtomicGuard {
            atomic: self,
            _not_send: std::marker::PhantomData,
        })
    }

    pub fn with<R, F>(&self, f: F) -> Result<R, SyncError>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// Read the value without locking.
    ///
    /// # Safety
    ///
    /// No other thread may hold the lock or write the value while the
    /// returned reference is alive.
    pub unsafe fn get_unguarded(&self) -> &T {
        unsafe { &*self.value.get() }
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Clone> Atomic<T> {
    /// Clone the value under the lock
    pub fn get_copy(&self) -> Result<T, SyncError> {
        self.with(|value| value.clone())
    }
}

impl<T: Default> Default for Atomic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for Atomic<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atomic")
            .field("locked", &self.mutex.is_locked())
            .finish_non_exhaustive()
    }
}

pub struct AtomicGuard<'a, T> {
    atomic: &'a Atomic<T>,
    _not_send: std::marker::PhantomData<*const ()>,
}

impl<T> Deref for AtomicGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.atomic.value.get() }
    }
}

impl<T> DerefMut for AtomicGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.atomic.value.get() }
    }
}

impl<T> Drop for AtomicGuard<'_, T> {
    fn drop(&mut self) {
        if self.atomic.mutex.unlock().is_ok() {
            diagnostics::emit(&TraceEvent::MonitorUnlocked);
        }
    }
}
