use std::sync::Arc;
use std::time::Instant;

use time::Duration;

/// A source of the current `Instant`.
///
/// The `UniqueDelayQueue` reads the time only through this trait, so tests can substitute a
/// clock they control. In most situations you can just use `SystemClock`.
pub trait Clock: Send + Sync {
    /// Returns the current `Instant`.
    fn now(&self) -> Instant;
}

/// A `Clock` backed by `Instant::now`.
///
/// # Examples
///
/// Basic usage:
///
/// ```
/// use unique_delay_queue::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// assert!(clock.now() <= clock.now());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<'a, C: Clock + ?Sized> Clock for &'a C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// A `Clock` that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give another to the queue.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone)]
pub struct FakeClock {
    now: Arc<parking_lot::Mutex<Instant>>,
}

#[cfg(any(test, feature = "test-util"))]
impl FakeClock {
    /// Creates a `FakeClock` frozen at the real current `Instant`.
    pub fn new() -> FakeClock {
        FakeClock::starting_at(Instant::now())
    }

    /// Creates a `FakeClock` frozen at `start`.
    pub fn starting_at(start: Instant) -> FakeClock {
        FakeClock {
            now: Arc::new(parking_lot::Mutex::new(start)),
        }
    }

    /// Moves the clock forward by `step`.
    pub fn step(&self, step: std::time::Duration) {
        let mut now = self.now.lock();
        *now += step;
    }

    /// Sets the clock to `instant`.
    ///
    /// # Panics
    ///
    /// Panics if `instant` is earlier than the current fake time. Monotonic clocks never go back.
    pub fn set(&self, instant: Instant) {
        let mut now = self.now.lock();
        assert!(instant >= *now, "FakeClock cannot move backwards");
        *now = instant;
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for FakeClock {
    fn default() -> FakeClock {
        FakeClock::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Applies a signed `delay` to `now`.
///
/// A negative delay reaching before the clock's origin saturates to `now`, which is already due.
/// Returns `None` when a positive delay overflows `Instant`; such an entry is never due.
pub(crate) fn offset(now: Instant, delay: Duration) -> Option<Instant> {
    let magnitude = delay.unsigned_abs();
    if delay.is_negative() {
        Some(now.checked_sub(magnitude).unwrap_or(now))
    } else {
        now.checked_add(magnitude)
    }
}
