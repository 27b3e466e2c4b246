//!
//! Bounded Thread Registry
//!
//! A fixed number of thread slots. `create` hands out a `Thread` bound to a
//! slot, or `SyncError::RegistryFull` once every slot is taken. A slot is
//! released when its `Thread` is dropped, so the capacity limits live
//! threads, not total threads ever created.
//!

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use concord_core::ThreadConfig;
use indexmap::IndexMap;

use crate::errors::SyncError;
use crate::thread::{Shared, Thread, ThreadContext};

struct RegistryInner {
    capacity: usize,
    live: Mutex<IndexMap<u64, Weak<Shared>>>,
}

impl RegistryInner {
    fn live(&self) -> MutexGuard<'_, IndexMap<u64, Weak<Shared>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone)]
pub struct ThreadRegistry {
    inner: Arc<RegistryInner>,
}

impl ThreadRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                capacity,
                live: Mutex::new(IndexMap::with_capacity(capacity)),
            }),
        }
    }

    pub fn from_config(config: &ThreadConfig) -> Self {
        Self::new(config.registry_capacity)
    }

    /// Create a thread occupying one slot
    pub fn create<F>(&self, name: impl Into<String>, body: F) -> Result<Thread, SyncError>
    where
        F: FnMut(&ThreadContext) + Send + 'static,
    {
        let mut live = self.inner.live();
        if live.len() >= self.inner.capacity {
            tracing::warn!(
                capacity = self.inner.capacity,
                "thread registry exhausted"
            );
            return Err(SyncError::RegistryFull {
                capacity: self.inner.capacity,
            });
        }

        let mut thread = Thread::new(name, body);
        live.insert(thread.id(), Arc::downgrade(thread.shared()));
        drop(live);

        thread.attach_slot(RegistrySlot {
            registry: Arc::downgrade(&self.inner),
            id: thread.id(),
        });
        Ok(thread)
    }

    pub fn len(&self) -> usize {
        self.inner.live().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Current names of the registered threads, in creation order
    pub fn names(&self) -> Vec<String> {
        self.inner
            .live()
            .values()
            .filter_map(Weak::upgrade)
            .map(|shared| shared.name())
            .collect()
    }
}

impl std::fmt::Debug for ThreadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadRegistry")
            .field("capacity", &self.capacity())
            .field("live", &self.len())
            .finish()
    }
}

/// Frees its registry slot on drop
pub(crate) struct RegistrySlot {
    registry: Weak<RegistryInner>,
    id: u64,
}

impl Drop for RegistrySlot {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.live().shift_remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_reports_exhaustion() {
        let registry = ThreadRegistry::new(2);
        let first = registry.create("a", |_| {}).unwrap();
        let _second = registry.create("b", |_| {}).unwrap();
        assert!(first.is_registered());

        let err = registry.create("c", |_| {}).unwrap_err();
        assert_eq!(err, SyncError::RegistryFull { capacity: 2 });

        drop(first);
        assert_eq!(registry.len(), 1);
        registry.create("c", |_| {}).unwrap();
    }

    #[test]
    fn test_names_follow_renames() {
        let registry = ThreadRegistry::new(4);
        let a = registry.create("reader", |_| {}).unwrap();
        let _b = registry.create("writer", |_| {}).unwrap();
        a.set_name("reader-1");
        assert_eq!(registry.names(), vec!["reader-1", "writer"]);
    }

    #[test]
    fn test_started_threads_hold_their_slot_until_dropped() {
        let registry = ThreadRegistry::from_config(&ThreadConfig {
            registry_capacity: 1,
        });
        let mut t = registry.create("runner", |_| {}).unwrap();
        t.start().unwrap();
        t.join().unwrap();
        assert!(registry.create("next", |_| {}).is_err());
        drop(t);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_slot_outliving_registry() {
        let registry = ThreadRegistry::new(1);
        let thread = registry.create("orphan", |_| {}).unwrap();
        drop(registry);
        drop(thread);
    }
}
