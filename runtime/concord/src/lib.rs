//!
//! concord - Concurrency and Coordination Toolkit
//!
//! Re-exports the concord crates under one roof:
//!
//! - `sync` - `Semaphore`, `Mutex`, `RankedCondition`, `Monitor<T>`,
//!   `Atomic<T>`, `Thread`, `ThreadRegistry`, `ThreadGenerator`
//! - `mailbox` - bounded priority `Mailbox<T>` with message time-to-live
//! - `linda` - the `TupleSpace` and its `out/in_/inp/rd/rdp/eval` functions
//! - `base` - `concord.toml` configuration and the diagnostic sink
//!
//! `init` loads the nearest `concord.toml` (or the defaults) and applies
//! its diagnostic switches.
//!

use std::path::Path;

pub use concord_core as base;
pub use concord_linda as linda;
pub use concord_mailbox as mailbox;
pub use concord_sync as sync;

pub use concord_core::{Config, ConfigError};
pub use concord_linda::{template, tuple, LindaError, Template, Tuple, TupleSpace};
pub use concord_mailbox::{Delivery, Mailbox, Priority};
pub use concord_sync::{
    Atomic, Monitor, Monitorable, Mutex, RankedCondition, Semaphore, SyncError, Thread,
    ThreadGenerator, ThreadRegistry,
};

/// Load the `concord.toml` found at or above `start`, falling back to the
/// defaults when there is none, and apply its diagnostics section.
pub fn init(start: &Path) -> Result<Config, ConfigError> {
    let config = match concord_core::find_config(start) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading concord config");
            Config::from_path(&path)?
        }
        None => Config::default(),
    };
    config.apply_diagnostics();
    Ok(config)
}
