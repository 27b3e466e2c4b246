//!
//! Diagnostic Sink
//!
//! The coordination primitives never print. At each trace point they build a
//! `TraceEvent` and hand it to `emit`, which forwards it to whatever
//! `DiagnosticSink` has been installed for the process. With nothing
//! installed, `emit` returns after a single atomic load, so the primitives
//! behave identically with and without diagnostics.
//!
//! Events are grouped into categories (thread, monitor, condition, mailbox,
//! linda) that can be switched on and off independently.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use concord_core::diagnostics::{self, Category, TracingSink};
//!
//! concord_core::diagnostics::init_logging(tracing::Level::DEBUG);
//! diagnostics::install(Arc::new(TracingSink));
//! diagnostics::set_enabled(Category::Monitor, false);
//! ```
//!

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Area of the toolkit a trace event comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Thread,
    Monitor,
    Condition,
    Mailbox,
    Linda,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Thread,
        Category::Monitor,
        Category::Condition,
        Category::Mailbox,
        Category::Linda,
    ];

    fn bit(self) -> u8 {
        match self {
            Category::Thread => 1 << 0,
            Category::Monitor => 1 << 1,
            Category::Condition => 1 << 2,
            Category::Mailbox => 1 << 3,
            Category::Linda => 1 << 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Thread => "thread",
            Category::Monitor => "monitor",
            Category::Condition => "condition",
            Category::Mailbox => "mailbox",
            Category::Linda => "linda",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single trace point. Tuple payloads are borrowed as `Display` so they
/// are only rendered when a sink actually records them.
#[derive(Clone, Copy)]
pub enum TraceEvent<'a> {
    ThreadStarted { id: u64, name: &'a str },
    ThreadFinished { id: u64, name: &'a str },
    ThreadJoined { id: u64, name: &'a str },
    MonitorLocking,
    MonitorLocked,
    MonitorUnlocked,
    ConditionBlocked { rank: u32 },
    ConditionReleased { rank: u32 },
    MailboxPut { mailbox: &'a str, priority: &'a str },
    MailboxGet { mailbox: &'a str, status: &'a str },
    TupleInserted { tuple: &'a dyn fmt::Display },
    TupleMatched { tuple: &'a dyn fmt::Display },
    TupleRemoved { tuple: &'a dyn fmt::Display },
    TupleBlocked { template: &'a dyn fmt::Display },
}

impl TraceEvent<'_> {
    pub fn category(&self) -> Category {
        match self {
            TraceEvent::ThreadStarted { .. }
            | TraceEvent::ThreadFinished { .. }
            | TraceEvent::ThreadJoined { .. } => Category::Thread,
            TraceEvent::MonitorLocking
            | TraceEvent::MonitorLocked
            | TraceEvent::MonitorUnlocked => Category::Monitor,
            TraceEvent::ConditionBlocked { .. } | TraceEvent::ConditionReleased { .. } => {
                Category::Condition
            }
            TraceEvent::MailboxPut { .. } | TraceEvent::MailboxGet { .. } => Category::Mailbox,
            TraceEvent::TupleInserted { .. }
            | TraceEvent::TupleMatched { .. }
            | TraceEvent::TupleRemoved { .. }
            | TraceEvent::TupleBlocked { .. } => Category::Linda,
        }
    }
}

impl fmt::Display for TraceEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::ThreadStarted { id, name } => write!(f, "thread[#{}] {} started", id, name),
            TraceEvent::ThreadFinished { id, name } => {
                write!(f, "thread[#{}] {} finished", id, name)
            }
            TraceEvent::ThreadJoined { id, name } => write!(f, "thread[#{}] {} joined", id, name),
            TraceEvent::MonitorLocking => f.write_str("trying to lock"),
            TraceEvent::MonitorLocked => f.write_str("locked"),
            TraceEvent::MonitorUnlocked => f.write_str("unlocked"),
            TraceEvent::ConditionBlocked { rank } => write!(f, "block (rank {})", rank),
            TraceEvent::ConditionReleased { rank } => write!(f, "release (rank {})", rank),
            TraceEvent::MailboxPut { mailbox, priority } => {
                write!(f, "mailbox({}) message put with {} priority", mailbox, priority)
            }
            TraceEvent::MailboxGet { mailbox, status } => {
                write!(f, "mailbox({}) get -> {}", mailbox, status)
            }
            TraceEvent::TupleInserted { tuple } => write!(f, "{} put", tuple),
            TraceEvent::TupleMatched { tuple } => write!(f, "{} matched", tuple),
            TraceEvent::TupleRemoved { tuple } => write!(f, "{} removed", tuple),
            TraceEvent::TupleBlocked { template } => write!(f, "blocking on {}", template),
        }
    }
}

impl fmt::Debug for TraceEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceEvent({}: {})", self.category(), self)
    }
}

/// Receiver of trace events
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: &TraceEvent<'_>);
}

/// Sink forwarding every event to `tracing` under the `concord::<category>` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &TraceEvent<'_>) {
        match event.category() {
            Category::Thread => tracing::debug!(target: "concord::thread", "{}", event),
            Category::Monitor => tracing::trace!(target: "concord::monitor", "{}", event),
            Category::Condition => tracing::trace!(target: "concord::condition", "{}", event),
            Category::Mailbox => tracing::debug!(target: "concord::mailbox", "{}", event),
            Category::Linda => tracing::debug!(target: "concord::linda", "{}", event),
        }
    }
}

const ALL_CATEGORIES: u8 = 0b1_1111;

static ACTIVE: AtomicBool = AtomicBool::new(false);
static ENABLED: AtomicU8 = AtomicU8::new(ALL_CATEGORIES);
static SINK: RwLock<Option<Arc<dyn DiagnosticSink>>> = RwLock::new(None);

/// Install the process-wide sink, replacing any previous one
pub fn install(sink: Arc<dyn DiagnosticSink>) {
    let mut slot = SINK.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(sink);
    ACTIVE.store(true, Ordering::Release);
}

/// Remove the installed sink; subsequent events are dropped
pub fn uninstall() -> Option<Arc<dyn DiagnosticSink>> {
    let mut slot = SINK.write().unwrap_or_else(PoisonError::into_inner);
    ACTIVE.store(false, Ordering::Release);
    slot.take()
}

pub fn set_enabled(category: Category, enabled: bool) {
    if enabled {
        ENABLED.fetch_or(category.bit(), Ordering::AcqRel);
    } else {
        ENABLED.fetch_and(!category.bit(), Ordering::AcqRel);
    }
}

/// Whether an event of this category would reach a sink right now
pub fn enabled(category: Category) -> bool {
    ACTIVE.load(Ordering::Acquire) && ENABLED.load(Ordering::Acquire) & category.bit() != 0
}

pub fn emit(event: &TraceEvent<'_>) {
    if !enabled(event.category()) {
        return;
    }
    let slot = SINK.read().unwrap_or_else(PoisonError::into_inner);
    if let Some(sink) = slot.as_ref() {
        sink.record(event);
    }
}

/// Install a stderr `tracing` subscriber. Returns false if a global
/// subscriber was already set.
pub fn init_logging(level: tracing::Level) -> bool {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl DiagnosticSink for Recorder {
        fn record(&self, event: &TraceEvent<'_>) {
            self.lines.lock().unwrap().push(event.to_string());
        }
    }

    #[test]
    fn test_event_rendering() {
        let tuple = "(k,42)";
        assert_eq!(
            TraceEvent::ThreadStarted { id: 3, name: "worker" }.to_string(),
            "thread[#3] worker started"
        );
        assert_eq!(TraceEvent::TupleRemoved { tuple: &tuple }.to_string(), "(k,42) removed");
        assert_eq!(
            TraceEvent::MailboxGet { mailbox: "inbox", status: "timeout" }.to_string(),
            "mailbox(inbox) get -> timeout"
        );
        assert_eq!(TraceEvent::ConditionBlocked { rank: 7 }.category(), Category::Condition);
    }

    // Single test for the global slot so parallel tests don't race on it.
    #[test]
    fn test_install_filter_uninstall() {
        let recorder = Arc::new(Recorder::default());
        emit(&TraceEvent::MonitorLocked);
        assert!(recorder.lines.lock().unwrap().is_empty());

        install(recorder.clone());
        emit(&TraceEvent::MonitorLocked);
        set_enabled(Category::Monitor, false);
        assert!(!enabled(Category::Monitor));
        emit(&TraceEvent::MonitorUnlocked);
        emit(&TraceEvent::ThreadJoined { id: 1, name: "main" });
        set_enabled(Category::Monitor, true);
        assert!(uninstall().is_some());
        emit(&TraceEvent::MonitorLocking);

        let lines = recorder.lines.lock().unwrap();
        assert_eq!(*lines, vec!["locked".to_string(), "thread[#1] main joined".to_string()]);
    }
}
