//! A concurrent deduplicating work queue where each key can only be taken once its delay
//! expires.
//!
//! Meant to sit inside a controller's reconciliation loop: schedule a retry for a key with
//! `UniqueDelayQueue::enqueue_if_new`, and collect the keys that are due with
//! `UniqueDelayQueue::get_work` on every tick.

#![warn(missing_docs)]

mod clock;
mod unique_queue;

#[cfg(any(test, feature = "test-util"))]
pub use clock::FakeClock;
pub use clock::{Clock, SystemClock};
pub use unique_queue::UniqueDelayQueue;
