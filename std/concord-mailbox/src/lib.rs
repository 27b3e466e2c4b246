//!
//! concord-mailbox - Priority Mailbox
//!
//! A bounded buffer of messages between threads, built as a monitor with
//! two ranked conditions (`not_full`, `not_empty`).
//!
//! ## Operations
//!
//! - `put(message)` / `put_with(message, priority, ttl)` - block while full
//! - `get(timeout) -> Delivery<T>` - `Success(message)`, `Timeout` when no
//!   message arrived in time, `Expired` when the head message outlived its
//!   time-to-live
//!
//! Timeouts and expiry are ordinary outcomes, not errors; `Err` is only
//! returned for monitor misuse such as calling `get` re-entrantly.
//!

pub mod mailbox;
pub mod message;

pub use mailbox::{Mailbox, DEFAULT_CAPACITY};
pub use message::{Delivery, MessageWrap, Priority, Status};
