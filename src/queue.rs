//! Bounded FIFO queue with an explicit closed state
//!
//! Every producer/consumer seam in the relay goes through one of these: the
//! capture queue, the playback queue and each peer's outbound mailbox. Pushes
//! never block; a full queue discards the incoming item (drop-newest) and
//! reports it, leaving the queued contents untouched. Closing the queue is
//! the cancellation signal: consumers drain whatever is left and then observe
//! closure.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

/// Outcome of a non-blocking push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    /// Item enqueued
    Pushed,
    /// Queue full; the incoming item was discarded
    Dropped,
    /// Queue closed; the push was a no-op
    Closed,
}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity queue with non-blocking push and waiting pop
///
/// Expects a single consumer; producers may be many. Waiting is available
/// both to async tasks ([`pop`](Self::pop)) and to plain threads
/// ([`pop_blocking`](Self::pop_blocking)).
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    notify: Notify,
    condvar: Condvar,
    dropped: AtomicU64,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be nonzero");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            notify: Notify::new(),
            condvar: Condvar::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push an item without blocking, applying the drop-newest policy on
    /// overflow. Pushing into a closed queue is a no-op.
    pub fn push(&self, item: T) -> PushResult {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return PushResult::Closed;
            }
            if inner.items.len() >= self.capacity {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return PushResult::Dropped;
            }
            inner.items.push_back(item);
        }
        self.notify.notify_one();
        self.condvar.notify_one();
        PushResult::Pushed
    }

    /// Wait until an item is available or the queue is closed and drained.
    /// `None` means closed: no further items will ever arrive.
    pub async fn pop(&self) -> Option<T> {
        loop {
            {
                let mut inner = self.inner.lock();
                if let Some(item) = inner.items.pop_front() {
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }
            // A push between the unlock and this await leaves a stored
            // permit, so the wakeup cannot be lost.
            self.notify.notified().await;
        }
    }

    /// Thread-blocking counterpart of [`pop`](Self::pop)
    pub fn pop_blocking(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            self.condvar.wait(&mut inner);
        }
    }

    /// Take an item if one is immediately available
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    /// Close the queue. Idempotent. Queued items remain poppable; waiting
    /// consumers wake and observe closure once drained.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
        }
        self.notify.notify_waiters();
        self.condvar.notify_all();
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Current queue length
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether the queue holds no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items discarded by the drop-newest policy since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Shared handle to a bounded queue
pub type SharedQueue<T> = Arc<BoundedQueue<T>>;

/// Create a new shared bounded queue
pub fn shared_queue<T>(capacity: usize) -> SharedQueue<T> {
    Arc::new(BoundedQueue::new(capacity))
}
