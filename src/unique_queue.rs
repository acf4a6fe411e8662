use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use time::Duration;
use tracing::{debug, trace};

use crate::clock::{offset, Clock, SystemClock};

/// A concurrent work queue that holds each key at most once and hands it out only after its
/// delay has elapsed.
///
/// The queue never blocks: `get_work` returns whatever is due right now, possibly nothing, and
/// the caller decides how often to poll. Keys come back in no particular order.
///
/// Scheduling a key that is already pending does nothing. The first delay wins and is neither
/// refreshed nor shortened by later calls, so a key that keeps failing is not retried more often
/// than it was first scheduled for.
///
/// All time is read from the `Clock` given at construction.
///
/// # Examples
///
/// Basic usage:
///
/// ```
/// use unique_delay_queue::{SystemClock, UniqueDelayQueue};
/// use time::Duration;
///
/// let queue = UniqueDelayQueue::new(SystemClock);
/// assert!(queue.enqueue_if_new("default/web-0".to_string(), Duration::minutes(-1)));
/// assert!(queue.enqueue_if_new("default/web-1".to_string(), Duration::hours(1)));
///
/// assert_eq!(queue.get_work(), vec!["default/web-0".to_string()]);
/// assert!(queue.get_work().is_empty());
/// assert_eq!(queue.len(), 1);
/// ```
#[derive(Debug)]
pub struct UniqueDelayQueue<K, C = SystemClock> {
    /// Points to the data shared between handles of the same queue (created by cloning a
    /// queue). Usually the different handles live in different threads.
    shared_data: Arc<UniqueDelayQueueSharedData<K, C>>,
}

/// The underlying data of a queue.
#[derive(Debug)]
struct UniqueDelayQueueSharedData<K, C> {
    /// Mutex protected map from each pending key to the time it becomes due.
    pending: Mutex<HashMap<K, ReadyAt>>,

    clock: C,
}

/// When a pending key becomes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadyAt {
    At(Instant),

    /// The delay overflowed `Instant`.
    Never,
}

impl ReadyAt {
    fn from_delay(now: Instant, delay: Duration) -> ReadyAt {
        match offset(now, delay) {
            Some(instant) => ReadyAt::At(instant),
            None => ReadyAt::Never,
        }
    }

    fn is_due(self, now: Instant) -> bool {
        match self {
            ReadyAt::At(instant) => instant <= now,
            ReadyAt::Never => false,
        }
    }
}

impl<K, C> UniqueDelayQueue<K, C>
where
    K: Eq + Hash,
    C: Clock,
{
    /// Creates an empty `UniqueDelayQueue` reading time from `clock`.
    ///
    /// # Examples
    ///
    /// Basic usage:
    ///
    /// ```
    /// use unique_delay_queue::{SystemClock, UniqueDelayQueue};
    ///
    /// let queue: UniqueDelayQueue<String> = UniqueDelayQueue::new(SystemClock);
    /// assert!(queue.is_empty());
    /// ```
    pub fn new(clock: C) -> UniqueDelayQueue<K, C> {
        UniqueDelayQueue::with_capacity(0, clock)
    }

    /// Creates an empty `UniqueDelayQueue` with room for at least `capacity` pending keys before
    /// reallocating.
    pub fn with_capacity(capacity: usize, clock: C) -> UniqueDelayQueue<K, C> {
        UniqueDelayQueue {
            shared_data: Arc::new(UniqueDelayQueueSharedData {
                pending: Mutex::new(HashMap::with_capacity(capacity)),
                clock,
            }),
        }
    }

    /// Schedules `key` to become due after `delay`, unless `key` is already pending.
    ///
    /// A zero or negative `delay` makes the key due immediately. If `key` is already pending
    /// its original due time is kept, whatever `delay` is passed now.
    ///
    /// Returns `true` if the key was inserted.
    ///
    /// # Examples
    ///
    /// Basic usage:
    ///
    /// ```
    /// use unique_delay_queue::{SystemClock, UniqueDelayQueue};
    /// use time::Duration;
    ///
    /// let queue = UniqueDelayQueue::new(SystemClock);
    ///
    /// assert!(queue.enqueue_if_new("foo", Duration::hours(1)));
    /// // Already pending: the one hour delay stands.
    /// assert!(!queue.enqueue_if_new("foo", Duration::ZERO));
    /// assert!(queue.get_work().is_empty());
    /// ```
    pub fn enqueue_if_new(&self, key: K, delay: Duration) -> bool {
        let now = self.shared_data.clock.now();
        let mut pending = self.shared_data.pending.lock();

        let inserted = match pending.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(ReadyAt::from_delay(now, delay));
                true
            }
        };

        trace!(inserted, delay = %delay, "enqueue_if_new");
        inserted
    }

    /// Removes and returns every key that is due.
    ///
    /// All keys are compared against a single reading of the clock. Keys that are not yet due
    /// stay in the queue. The order of the returned keys is unspecified.
    ///
    /// # Examples
    ///
    /// Basic usage:
    ///
    /// ```
    /// use unique_delay_queue::{SystemClock, UniqueDelayQueue};
    /// use time::Duration;
    ///
    /// let queue = UniqueDelayQueue::new(SystemClock);
    /// queue.enqueue_if_new(1, Duration::ZERO);
    /// queue.enqueue_if_new(2, Duration::seconds(-30));
    ///
    /// let mut due = queue.get_work();
    /// due.sort();
    /// assert_eq!(due, vec![1, 2]);
    /// assert!(queue.get_work().is_empty());
    /// ```
    pub fn get_work(&self) -> Vec<K> {
        let now = self.shared_data.clock.now();
        let mut pending = self.shared_data.pending.lock();

        let due: Vec<K> = pending
            .extract_if(|_, ready_at| ready_at.is_due(now))
            .map(|(key, _)| key)
            .collect();

        if !due.is_empty() {
            debug!(due = due.len(), pending = pending.len(), "drained due keys");
        }
        due
    }

    /// Returns the number of pending keys, due or not.
    pub fn len(&self) -> usize {
        self.shared_data.pending.lock().len()
    }

    /// Checks if the queue has no pending keys.
    pub fn is_empty(&self) -> bool {
        self.shared_data.pending.lock().is_empty()
    }

    /// Checks if `key` is pending.
    pub fn contains(&self, key: &K) -> bool {
        self.shared_data.pending.lock().contains_key(key)
    }

    /// Returns the `Instant` at which a pending `key` becomes due.
    ///
    /// Returns `None` if `key` is not pending, or if its delay was too large to represent and
    /// it will never become due.
    pub fn ready_at(&self, key: &K) -> Option<Instant> {
        match self.shared_data.pending.lock().get(key) {
            Some(ReadyAt::At(instant)) => Some(*instant),
            Some(ReadyAt::Never) | None => None,
        }
    }
}

impl<K: Eq + Hash> Default for UniqueDelayQueue<K, SystemClock> {
    /// Creates an empty `UniqueDelayQueue` on the system clock.
    fn default() -> UniqueDelayQueue<K, SystemClock> {
        UniqueDelayQueue::new(SystemClock)
    }
}

impl<K, C> Clone for UniqueDelayQueue<K, C> {
    /// Returns a new handle to the same underlying queue.
    ///
    /// This is how a queue is shared between the threads of a controller.
    fn clone(&self) -> UniqueDelayQueue<K, C> {
        UniqueDelayQueue {
            shared_data: self.shared_data.clone(),
        }
    }
}
