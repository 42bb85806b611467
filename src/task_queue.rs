//! Closable FIFO feeding the bounded worker pool.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Synchronized FIFO with blocking consumers and no length limit.
pub struct TaskQueue<T> {
    inner: Mutex<TaskQueueState<T>>,
    available: Condvar,
}

struct TaskQueueState<T> {
    queue: VecDeque<T>,
    closed: bool,
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TaskQueueState {
                queue: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Push an item; returns it back if the queue is closed.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        if guard.closed {
            return Err(item);
        }
        guard.queue.push_back(item);
        self.available.notify_one();
        Ok(())
    }

    /// Block until an item is available, or return `None` once the queue is
    /// closed and drained.
    pub fn pop_blocking_or_closed(&self) -> Option<T> {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        loop {
            if let Some(item) = guard.queue.pop_front() {
                return Some(item);
            }
            if guard.closed {
                return None;
            }
            // Wait releases the lock and re-acquires it before returning.
            guard = self.available.wait(guard).expect("condvar wait failed");
        }
    }

    /// Refuse further pushes and wake all blocked consumers.
    pub fn close(&self) {
        let mut guard = self.inner.lock().expect("task queue mutex poisoned");
        guard.closed = true;
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("task queue mutex poisoned");
        guard.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
