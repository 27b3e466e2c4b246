//!
//! Lifecycle-Tracked Threads
//!
//! A `Thread` is a named unit of execution backed by exactly one OS thread
//! once started. Its status moves idle -> active on `start` and
//! active -> finished when the body returns (or unwinds).
//!
//! - `start` on a thread that is not idle is a no-op returning `false`
//! - `join` on a thread that was never started returns `Ok(())` at once
//! - dropping a started thread joins it
//!
//! The body receives a `ThreadContext` through which it can read its own
//! descriptor, sleep, or park itself with `pause` until another thread
//! calls `Thread::resume`.
//!

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use concord_core::diagnostics::{self, TraceEvent};

use crate::errors::SyncError;
use crate::registry::RegistrySlot;
use crate::semaphore::Semaphore;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Idle,
    Active,
    Finished,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Active => "active",
            Status::Finished => "finished",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a thread's identity and status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub id: u64,
    pub name: String,
    pub status: Status,
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} '{}' ({})", self.id, self.name, self.status)
    }
}

struct Meta {
    name: String,
    status: Status,
}

pub(crate) struct Shared {
    id: u64,
    meta: Mutex<Meta>,
    pause: Semaphore,
}

impl Shared {
    fn meta(&self) -> MutexGuard<'_, Meta> {
        self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn name(&self) -> String {
        self.meta().name.clone()
    }

    fn set_status(&self, status: Status) {
        self.meta().status = status;
    }

    fn descriptor(&self) -> Descriptor {
        let meta = self.meta();
        Descriptor {
            id: self.id,
            name: meta.name.clone(),
            status: meta.status,
        }
    }
}

/// Work executed by a `Thread`
pub trait Runnable: Send + 'static {
    fn run(&mut self, ctx: &ThreadContext);
}

impl<F> Runnable for F
where
    F: FnMut(&ThreadContext) + Send + 'static,
{
    fn run(&mut self, ctx: &ThreadContext) {
        self(ctx)
    }
}

/// Handle passed to a running body
pub struct ThreadContext {
    shared: Arc<Shared>,
}

impl ThreadContext {
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn name(&self) -> String {
        self.shared.name()
    }

    pub fn descriptor(&self) -> Descriptor {
        self.shared.descriptor()
    }

    pub fn sleep_for(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Block until `Thread::resume` is called. A resume issued before the
    /// pause is remembered, so the pause returns immediately.
    pub fn pause(&self) {
        self.shared.pause.wait();
    }
}

/// Marks the thread finished when the body returns or unwinds
struct FinishGuard<'a> {
    shared: &'a Shared,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.shared.set_status(Status::Finished);
        let name = self.shared.name();
        diagnostics::emit(&TraceEvent::ThreadFinished {
            id: self.shared.id,
            name: &name,
        });
    }
}

pub struct Thread {
    shared: Arc<Shared>,
    body: Option<Box<dyn Runnable>>,
    handle: Option<JoinHandle<()>>,
    slot: Option<RegistrySlot>,
}

impl Thread {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&ThreadContext) + Send + 'static,
    {
        Self::from_runnable(name, body)
    }

    pub fn from_runnable<R: Runnable>(name: impl Into<String>, body: R) -> Self {
        let id = NEXT_ID.fetch_add(1, AtomicOrdering::Relaxed);
        Self {
            shared: Arc::new(Shared {
                id,
                meta: Mutex::new(Meta {
                    name: name.into(),
                    status: Status::Idle,
                }),
                pause: Semaphore::new(0),
            }),
            body: Some(Box::new(body)),
            handle: None,
            slot: None,
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    pub(crate) fn attach_slot(&mut self, slot: RegistrySlot) {
        self.slot = Some(slot);
    }

    /// Spawn the OS thread and run the body. Returns `Ok(false)` without
    /// doing anything if the thread was already started.
    pub fn start(&mut self) -> Result<bool, SyncError> {
        let Some(mut body) = self.body.take() else {
            return Ok(false);
        };

        let name = self.shared.name();
        self.shared.set_status(Status::Active);

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let ctx = ThreadContext { shared };
                let _finish = FinishGuard {
                    shared: &ctx.shared,
                };
                let name = ctx.name();
                diagnostics::emit(&TraceEvent::ThreadStarted {
                    id: ctx.id(),
                    name: &name,
                });
                body.run(&ctx);
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(true)
            }
            Err(err) => {
                self.shared.set_status(Status::Finished);
                Err(SyncError::Spawn {
                    name,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Wait for the body to finish. Joining a thread that was never
    /// started, or was already joined, returns immediately.
    pub fn join(&mut self) -> Result<(), SyncError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        if handle.thread().id() == std::thread::current().id() {
            self.handle = Some(handle);
            return Err(SyncError::JoinSelf {
                id: self.id(),
                name: self.name(),
            });
        }

        let outcome = handle.join();
        let name = self.name();
        diagnostics::emit(&TraceEvent::ThreadJoined {
            id: self.id(),
            name: &name,
        });

        outcome.map_err(|_| SyncError::ThreadPanicked { id: self.id(), name })
    }

    /// Release a body blocked in `ThreadContext::pause`
    pub fn resume(&self) {
        self.shared.pause.signal();
    }

    /// Rename the thread. The OS thread keeps the name it was spawned with.
    pub fn set_name(&self, name: impl Into<String>) {
        self.shared.meta().name = name.into();
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn name(&self) -> String {
        self.shared.name()
    }

    pub fn status(&self) -> Status {
        self.shared.meta().status
    }

    pub fn descriptor(&self) -> Descriptor {
        self.shared.descriptor()
    }

    pub fn is_registered(&self) -> bool {
        self.slot.is_some()
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        let _ = self.join();
    }
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("descriptor", &self.descriptor())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Thread {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Thread {}

impl PartialOrd for Thread {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Thread {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}
