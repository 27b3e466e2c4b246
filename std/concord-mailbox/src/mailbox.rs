//!
//! Bounded Priority Mailbox
//!
//! A monitor holding a priority heap of at most `capacity` messages and
//! two ranked conditions:
//!
//! - `not_full` - producers blocked on a full box, ranked by the priority
//!   of the message they carry, so urgent producers get space first
//! - `not_empty` - consumers blocked on an empty box
//!
//! `get` takes an optional timeout: `None` waits for a message forever,
//! `Some(d)` gives up after `d` with `Delivery::Timeout`. A message whose
//! time-to-live has elapsed when it reaches the head is discarded and
//! reported as `Delivery::Expired`; its slot is freed either way.
//!

use std::cell::{Cell, RefCell};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use concord_core::diagnostics::{self, TraceEvent};
use concord_core::{ConfigError, MailboxConfig};
use concord_sync::{CondFactory, Monitor, RankedCondition, SyncError};

use crate::message::{Delivery, MessageWrap, Priority};

pub const DEFAULT_CAPACITY: usize = 10;

struct MailboxState<T> {
    buffer: RefCell<BinaryHeap<MessageWrap<T>>>,
    next_seq: Cell<u64>,
    not_full: RankedCondition,
    not_empty: RankedCondition,
}

impl<T> MailboxState<T> {
    fn new(conds: &CondFactory, capacity: usize) -> Self {
        Self {
            buffer: RefCell::new(BinaryHeap::with_capacity(capacity)),
            next_seq: Cell::new(0),
            not_full: conds.condition(),
            not_empty: conds.condition(),
        }
    }

    fn len(&self) -> usize {
        self.buffer.borrow().len()
    }
}

pub struct Mailbox<T> {
    state: Monitor<MailboxState<T>>,
    capacity: usize,
    name: String,
    default_priority: Priority,
}

impl<T: Send> Mailbox<T> {
    /// A capacity of 0 is raised to 1; use `from_config` to reject it instead
    pub fn new(capacity: usize) -> Self {
        Self::named(capacity, "")
    }

    /// Same as `new`, with a name for diagnostics. Capacity 0 becomes 1.
    pub fn named(capacity: usize, name: impl Into<String>) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Monitor::new(|conds| MailboxState::new(conds, capacity)),
            capacity,
            name: name.into(),
            default_priority: Priority::default(),
        }
    }

    /// Build a mailbox with the configured capacity and default priority
    pub fn from_config(
        config: &MailboxConfig,
        name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if config.capacity == 0 {
            return Err(ConfigError::Invalid(
                "mailbox capacity must be at least 1".to_string(),
            ));
        }
        let priority: Priority = config.priority.parse()?;
        let mut mailbox = Self::named(config.capacity, name);
        mailbox.default_priority = priority;
        Ok(mailbox)
    }

    /// Put with the default priority and no time-to-live
    pub fn put(&self, message: T) -> Result<(), SyncError> {
        self.put_with(message, self.default_priority, Duration::ZERO)
    }

    /// Block while the box is full, then enqueue. `ttl` of zero never expires.
    pub fn put_with(&self, message: T, priority: Priority, ttl: Duration) -> Result<(), SyncError> {
        let state = self.state.enter()?;
        while state.len() >= self.capacity {
            state.not_full.wait(priority.rank())?;
        }

        let seq = state.next_seq.get();
        state.next_seq.set(seq + 1);
        state
            .buffer
            .borrow_mut()
            .push(MessageWrap::new(message, priority, ttl, seq));
        state.not_empty.signal();

        diagnostics::emit(&TraceEvent::MailboxPut {
            mailbox: &self.name,
            priority: priority.as_str(),
        });
        Ok(())
    }

    /// Take the most urgent message, waiting up to `timeout` (`None` = forever)
    pub fn get(&self, timeout: Option<Duration>) -> Result<Delivery<T>, SyncError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let state = self.state.enter()?;

        let wrap = loop {
            if let Some(wrap) = state.buffer.borrow_mut().pop() {
                break wrap;
            }
            match deadline {
                None => state.not_empty.wait(0)?,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(self.delivered(Delivery::Timeout));
                    }
                    state.not_empty.wait_timeout(0, deadline - now)?;
                }
            }
        };
        state.not_full.signal();

        let delivery = if wrap.is_alive_at(Instant::now()) {
            Delivery::Success(wrap.message)
        } else {
            Delivery::Expired
        };
        Ok(self.delivered(delivery))
    }

    fn delivered(&self, delivery: Delivery<T>) -> Delivery<T> {
        diagnostics::emit(&TraceEvent::MailboxGet {
            mailbox: &self.name,
            status: delivery.status().as_str(),
        });
        delivery
    }

    pub fn len(&self) -> Result<usize, SyncError> {
        self.state.with(|s| s.len())
    }

    pub fn is_empty(&self) -> Result<bool, SyncError> {
        Ok(self.len()? == 0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_priority(&self) -> Priority {
        self.default_priority
    }
}

impl<T: Send> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T> std::fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
