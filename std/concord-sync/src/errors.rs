//!
//! Synchronization error types.
//!
//! Only programmer misuse and resource exhaustion end up here. Timeouts are
//! ordinary return values of the operations that support them.
//!

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Thread '{thread}' already holds this mutex")]
    RecursiveLock { thread: String },

    #[error("Current thread does not hold the mutex")]
    NotOwner,

    #[error("Thread registry is full (capacity {capacity})")]
    RegistryFull { capacity: usize },

    #[error("Thread #{id} '{name}' panicked")]
    ThreadPanicked { id: u64, name: String },

    #[error("Thread #{id} '{name}' cannot join itself")]
    JoinSelf { id: u64, name: String },

    #[error("Failed to spawn thread '{name}': {reason}")]
    Spawn { name: String, reason: String },
}

/// Label for the calling OS thread, used in error messages
pub(crate) fn current_thread_label() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}
