//!
//! concord-sync - Synchronization Primitives
//!
//! Low-level building blocks with their own wakeup ordering, layered
//! leaf-first:
//!
//! ## Semaphore / Mutex
//!
//! - `Semaphore::new(n)` - counting semaphore; `wait` blocks while the count
//!   is exhausted, `signal` releases exactly one blocked caller
//! - `Mutex` - semaphore initialised to 1 with owner tracking, so a
//!   recursive `lock` is reported instead of deadlocking
//!
//! ## Monitors
//!
//! - `RankedCondition` - condition variable whose waiters wake in ascending
//!   rank order (FIFO among equal ranks)
//! - `Monitor<T>` - runs every call on its payload with the monitor mutex
//!   held and hands the payload a `CondFactory` bound to that mutex
//! - `Atomic<T>` - the same exclusion for plain data without conditions
//!
//! ## Threads
//!
//! - `Thread` - named unit of execution, idle -> active -> finished
//! - `ThreadRegistry` - fixed-capacity registry reporting exhaustion
//! - `ThreadGenerator` - spawns a fresh thread from a factory at random
//!   intervals
//!
//! Retry policy is always the caller's: guard every condition wait with a
//! `while !ready { cond.wait(rank)? }` loop.
//!

pub mod atomic;
pub mod condition;
pub mod errors;
pub mod generator;
pub mod monitor;
pub mod mutex;
pub mod registry;
pub mod semaphore;
pub mod thread;

pub use atomic::{Atomic, AtomicGuard};
pub use condition::{Rank, RankedCondition, RANK_INFINITE};
pub use errors::SyncError;
pub use generator::ThreadGenerator;
pub use monitor::{CondFactory, Monitor, MonitorGuard, Monitorable};
pub use mutex::{Mutex, MutexGuard};
pub use registry::ThreadRegistry;
pub use semaphore::Semaphore;
pub use thread::{Descriptor, Runnable, Status, Thread, ThreadContext};
