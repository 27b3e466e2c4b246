//!
//! Mailbox Message Types
//!
//! `Priority` is ordered most urgent first: `VeryHigh` has rank 0 and is
//! always delivered before anything queued with a larger rank. Messages of
//! equal priority are delivered in the order they were put.
//!

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use concord_core::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    VeryHigh,
    High,
    #[default]
    Medium,
    Low,
    VeryLow,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::VeryHigh,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::VeryLow,
    ];

    /// Numeric rank; lower ranks are served first
    pub fn rank(self) -> u32 {
        match self {
            Priority::VeryHigh => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
            Priority::VeryLow => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::VeryHigh => "very_high",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::VeryLow => "very_low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown mailbox priority '{s}'")))
    }
}

/// Outcome of a `get`, without the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Timeout,
    Expired,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Timeout => "timeout",
            Status::Expired => "expired",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `Mailbox::get`. Only `Success` carries a message; a timed-out
/// or expired delivery has no data to misinterpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery<T> {
    Success(T),
    Timeout,
    Expired,
}

impl<T> Delivery<T> {
    pub fn status(&self) -> Status {
        match self {
            Delivery::Success(_) => Status::Success,
            Delivery::Timeout => Status::Timeout,
            Delivery::Expired => Status::Expired,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Delivery::Success(_))
    }

    pub fn into_message(self) -> Option<T> {
        match self {
            Delivery::Success(message) => Some(message),
            _ => None,
        }
    }
}

/// A queued message with its delivery metadata
#[derive(Debug)]
pub struct MessageWrap<T> {
    pub message: T,
    pub priority: Priority,
    /// `Duration::ZERO` means the message never expires
    pub ttl: Duration,
    pub enqueued_at: Instant,
    seq: u64,
}

impl<T> MessageWrap<T> {
    pub(crate) fn new(message: T, priority: Priority, ttl: Duration, seq: u64) -> Self {
        Self {
            message,
            priority,
            ttl,
            enqueued_at: Instant::now(),
            seq,
        }
    }

    /// Whether the message may still be delivered at `now`
    pub fn is_alive_at(&self, now: Instant) -> bool {
        self.ttl.is_zero() || now.saturating_duration_since(self.enqueued_at) <= self.ttl
    }
}

// Max-heap order: the message that must be delivered next compares greatest.
impl<T> Ord for MessageWrap<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .rank()
            .cmp(&self.priority.rank())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for MessageWrap<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for MessageWrap<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for MessageWrap<T> {}
