//!
//! concord-core - Shared Ambient Services
//!
//! Everything the coordination crates need but that is not coordination
//! itself:
//!
//! - `diagnostics` - the injected diagnostic sink. Primitives report trace
//!   points (thread start/join, monitor lock/unlock, condition block/release,
//!   mailbox put/get, tuple insert/match/remove) through `emit`; with no sink
//!   installed every call is a no-op.
//! - `config` - `concord.toml` loading with defaults for mailbox capacity,
//!   thread registry size, generator timing and diagnostic switches.
//!

pub mod config;
pub mod diagnostics;
pub mod errors;

pub use config::{
    find_config, Config, DiagnosticsConfig, GeneratorConfig, MailboxConfig, ThreadConfig,
    CONFIG_FILE_NAME,
};
pub use diagnostics::{Category, DiagnosticSink, TraceEvent, TracingSink};
pub use errors::ConfigError;
