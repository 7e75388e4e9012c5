// Implements the blocking producer/consumer wrapper over a sequential queue.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{QueueError, Result};
use crate::sequential::SequentialQueue;

/// Sentinel capacity marking a queue that never blocks its producers.
const UNBOUNDED: usize = usize::MAX;

/// State guarded by the queue lock.
///
/// The wrapped queue is owned here for the lifetime of the wrapper, so
/// every inspection and mutation of it happens under the one lock. The
/// interrupt epoch lives beside it for the same reason: a waiter must be
/// able to check "was I interrupted" atomically with re-checking its
/// wait predicate.
struct State<Q> {
    queue: Q,
    interrupt_epoch: u64,
}

/// `BlockingQueue` adapts a caller-supplied [`SequentialQueue`] into a
/// thread-safe producer/consumer channel: [`Self::push`] blocks while the
/// queue is at capacity and [`Self::pull`] blocks while it is empty.
///
/// Coordination uses one mutex and one condition variable shared by every
/// producer and consumer. Each successful mutation wakes all waiters and
/// every waiter re-checks its predicate after waking, so spurious wakeups
/// and multi-waiter races resolve to another round of waiting rather than
/// a lost element or a busy loop.
///
/// The wrapper tracks nothing besides the wrapped queue itself: capacity
/// and emptiness are always read from the underlying collection, keeping
/// the additional memory footprint O(1) regardless of queue depth.
pub struct BlockingQueue<E, Q = VecDeque<E>> {
    state: Mutex<State<Q>>,
    signal: Condvar,
    capacity: usize,
    _element: PhantomData<fn(E) -> E>,
}

impl<E, Q> BlockingQueue<E, Q>
where
    Q: SequentialQueue<E>,
{
    /// Wraps `queue` without any capacity bound: producers never block.
    #[must_use]
    pub fn unbounded(queue: Q) -> Self {
        Self::wrap(queue, UNBOUNDED)
    }

    /// Wraps `queue` with a maximum capacity: a producer blocks while the
    /// queue holds `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::InvalidCapacity` when `capacity` is zero or
    /// smaller than what `queue` already holds, no partially-usable
    /// wrapper is produced.
    pub fn bounded(queue: Q, capacity: usize) -> Result<Self> {
        if capacity == 0 || queue.len() > capacity {
            return Err(QueueError::InvalidCapacity);
        }
        Ok(Self::wrap(queue, capacity))
    }

    fn wrap(queue: Q, capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                queue,
                interrupt_epoch: 0,
            }),
            signal: Condvar::new(),
            capacity,
            _element: PhantomData,
        }
    }

    /// Appends `item` to the tail of the wrapped queue, blocking the
    /// calling thread while the queue is at capacity.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Interrupted` when [`Self::interrupt_waiters`]
    /// fires while this call is blocked; nothing is inserted in that case.
    pub fn push(&self, item: E) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let entered = state.interrupt_epoch;
        while state.queue.len() >= self.capacity {
            tracing::debug!("Queue at capacity {}, producer waiting", self.capacity);
            state = self.signal.wait(state).unwrap();
            if state.interrupt_epoch != entered {
                return Err(QueueError::Interrupted);
            }
        }

        state.queue.enqueue(item);
        self.signal.notify_all();
        Ok(())
    }

    /// Removes and returns the head of the wrapped queue, blocking the
    /// calling thread while the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Interrupted` when [`Self::interrupt_waiters`]
    /// fires while this call is blocked; nothing is removed in that case.
    pub fn pull(&self) -> Result<E> {
        let mut state = self.state.lock().unwrap();
        let entered = state.interrupt_epoch;
        while state.queue.is_empty() {
            tracing::debug!("Queue empty, consumer waiting");
            state = self.signal.wait(state).unwrap();
            if state.interrupt_epoch != entered {
                return Err(QueueError::Interrupted);
            }
        }

        let item = state
            .queue
            .dequeue()
            .expect("should provide a head element after a non-empty check");
        self.signal.notify_all();
        Ok(item)
    }

    /// [`Self::push`] with a bounded wait: once `timeout` elapses the call
    /// gives up and the queue is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::TimedOut` when the queue stayed at capacity for
    /// the whole of `timeout`, and `QueueError::Interrupted` when
    /// [`Self::interrupt_waiters`] fires while this call is blocked.
    pub fn push_timeout(&self, item: E, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        let entered = state.interrupt_epoch;
        while state.queue.len() >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                return Err(QueueError::TimedOut(timeout));
            }

            let (reacquired, _) = self.signal.wait_timeout(state, deadline - now).unwrap();
            state = reacquired;
            if state.interrupt_epoch != entered {
                return Err(QueueError::Interrupted);
            }
        }

        state.queue.enqueue(item);
        self.signal.notify_all();
        Ok(())
    }

    /// [`Self::pull`] with a bounded wait: once `timeout` elapses the call
    /// gives up and the queue is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::TimedOut` when the queue stayed empty for the
    /// whole of `timeout`, and `QueueError::Interrupted` when
    /// [`Self::interrupt_waiters`] fires while this call is blocked.
    pub fn pull_timeout(&self, timeout: Duration) -> Result<E> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        let entered = state.interrupt_epoch;
        while state.queue.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return Err(QueueError::TimedOut(timeout));
            }

            let (reacquired, _) = self.signal.wait_timeout(state, deadline - now).unwrap();
            state = reacquired;
            if state.interrupt_epoch != entered {
                return Err(QueueError::Interrupted);
            }
        }

        let item = state
            .queue
            .dequeue()
            .expect("should provide a head element after a non-empty check");
        self.signal.notify_all();
        Ok(item)
    }

    /// Delivers the external cancellation signal: every thread blocked in
    /// a [`Self::push`] or [`Self::pull`] wait at this moment wakes and
    /// fails with `QueueError::Interrupted`, having mutated nothing.
    ///
    /// Calls that are not waiting, and all future calls, are unaffected;
    /// the queue itself stays fully usable.
    pub fn interrupt_waiters(&self) {
        let mut state = self.state.lock().unwrap();
        state.interrupt_epoch += 1;
        drop(state);

        self.signal.notify_all();
    }

    /// Returns the number of elements currently held by the wrapped queue.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    /// Indicates whether the wrapped queue holds no elements.
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().queue.is_empty()
    }

    /// Returns the capacity bound, or `None` for an unbounded queue.
    pub fn capacity(&self) -> Option<usize> {
        if self.capacity == UNBOUNDED {
            None
        } else {
            Some(self.capacity)
        }
    }
}
