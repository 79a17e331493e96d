use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Blocking FIFO shared by a pool of workers.
///
/// `pop` parks the caller while the queue is empty. Once [`WorkQueue::shutdown`]
/// has been called, remaining items are still handed out but an empty queue
/// answers `None` instead of blocking, so no worker is left parked forever.
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
    closed: AtomicBool,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a queue already holding `items`, in order.
    pub fn with_items(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
            available: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Append to the tail and wake one waiting consumer.
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
        self.available.notify_one();
    }

    /// Append several items under one lock acquisition.
    pub fn push_all(&self, batch: impl IntoIterator<Item = T>) {
        let mut pushed = 0;
        {
            let mut items = self.lock();
            for item in batch {
                items.push_back(item);
                pushed += 1;
            }
        }
        for _ in 0..pushed {
            self.available.notify_one();
        }
    }

    /// Take the head of the queue, blocking while it is empty.
    ///
    /// Returns `None` only when the queue is empty and has been shut down.
    pub fn pop(&self) -> Option<T> {
        let mut items = self.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            if self.is_shutdown() {
                return None;
            }
            items = self
                .available
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Advisory snapshot of the number of pending items.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Stop blocking: wake every parked consumer and make empty pops return `None`.
    ///
    /// Returns `true` for the call that actually closed the queue.
    pub fn shutdown(&self) -> bool {
        // The flag flips under the lock so a consumer between its emptiness
        // check and `wait` cannot miss the wakeup.
        let first = {
            let _items = self.lock();
            !self.closed.swap(true, Ordering::AcqRel)
        };
        self.available.notify_all();
        first
    }

    pub fn is_shutdown(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
