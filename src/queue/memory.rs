//! In-process [`Queue`] implementation.
//!
//! [`MemoryQueue`] is a `VecDeque` guarded by a `tokio::sync::Mutex`, with
//! a `Notify` standing in for the "mutual-exclusion primitive with a
//! condition signal" of §4.B. `push` appends and notifies one waiter;
//! `pop` waits on the signal until the queue is non-empty or its timeout
//! elapses.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::error::TaskRunnerError;
use crate::task::Task;

use super::Queue;

/// Thread-safe in-process FIFO queue.
///
/// # Examples
///
/// ```
/// use taskrunner::queue::memory::MemoryQueue;
/// use taskrunner::queue::Queue;
/// use taskrunner::task::Task;
/// use std::collections::HashMap;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let queue = MemoryQueue::new();
/// queue.push(Task::new("square".to_string(), HashMap::new())).await.unwrap();
/// let popped = queue.pop(Duration::from_millis(10)).await.unwrap();
/// assert!(popped.is_some());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Mutex<VecDeque<Task>>,
    notify: Notify,
}

impl MemoryQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn push(&self, task: Task) -> Result<(), TaskRunnerError> {
        self.entries.lock().await.push_back(task);
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<Task>, TaskRunnerError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Subscribe before checking so a push racing with this check
            // cannot be missed: Notify buffers the wakeup for a future
            // that already exists, even if it hasn't been polled yet.
            let notified = self.notify.notified();

            if let Some(task) = self.entries.lock().await.pop_front() {
                return Ok(Some(task));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn length(&self) -> Result<usize, TaskRunnerError> {
        Ok(self.entries.lock().await.len())
    }
}
