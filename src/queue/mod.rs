//! The [`Queue`] capability: an ordered FIFO channel from submitters to
//! workers.
//!
//! Two implementations are provided: [`memory::MemoryQueue`] (in-process)
//! and, behind the `redis-backend` feature, [`remote::RedisQueue`].

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod remote;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TaskRunnerError;
use crate::task::Task;

/// A FIFO queue of pending tasks.
///
/// Every operation is individually atomic with respect to other
/// operations on the same queue. Implementations must be `Send + Sync`
/// to support concurrent submitters and executors.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Appends `task` to the tail of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::BackendUnavailable`] if the underlying
    /// transport is down.
    async fn push(&self, task: Task) -> Result<(), TaskRunnerError>;

    /// Removes and returns the head of the queue, blocking up to
    /// `timeout` if the queue is empty. Returns `None` on timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::BackendUnavailable`] on transport
    /// failure.
    async fn pop(&self, timeout: Duration) -> Result<Option<Task>, TaskRunnerError>;

    /// Best-effort current length. May be stale under concurrent mutation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::BackendUnavailable`] on transport
    /// failure.
    async fn length(&self) -> Result<usize, TaskRunnerError>;
}
