//! Redis-backed [`Queue`] implementation.
//!
//! [`RedisQueue`] serializes tasks to canonical JSON and pushes/pops them
//! against a single well-known Redis list key, using `RPUSH` /
//! `BLPOP` / `LLEN`. It is a thin adapter -- no domain logic lives here,
//! matching the "dumb KV backend" convention the in-memory backend
//! follows too.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::error::TaskRunnerError;
use crate::task::Task;

use super::Queue;

/// Redis-backed FIFO queue.
///
/// Holds a [`MultiplexedConnection`], which is cheap to clone -- every
/// clone shares the same underlying TCP connection, so this backend is
/// safe for concurrent use by all executors without additional pooling.
#[derive(Clone)]
pub struct RedisQueue {
    conn: MultiplexedConnection,
    list_key: String,
    malformed_count: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl RedisQueue {
    /// Connects to Redis at `url` and returns a queue using the list key
    /// `<prefix>:queue`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::BackendUnavailable`] if the client
    /// cannot be created or the connection cannot be established.
    pub async fn new(url: &str, prefix: &str) -> Result<Self, TaskRunnerError> {
        let client = redis::Client::open(url)
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-queue", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-queue", e))?;
        Ok(Self {
            conn,
            list_key: format!("{prefix}:queue"),
            malformed_count: std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0)),
        })
    }

    /// Number of queue entries discarded so far because they could not be
    /// deserialized into a `Task` (§7 `MalformedEntry`).
    pub fn malformed_count(&self) -> u64 {
        self.malformed_count.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[async_trait]
impl Queue for RedisQueue {
    async fn push(&self, task: Task) -> Result<(), TaskRunnerError> {
        let payload = serde_json::to_vec(&task).expect("Task serialization cannot fail");
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(&self.list_key, payload)
            .await
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-queue", e))
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<Task>, TaskRunnerError> {
        let mut conn = self.conn.clone();
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            // BLPOP timeout is in whole seconds; round up so a short
            // remaining sub-second budget still yields at least one attempt.
            let remaining_secs = ((remaining.as_millis() as f64) / 1000.0).ceil() as f64;
            let result: Option<(String, Vec<u8>)> = conn
                .blpop(&self.list_key, remaining_secs)
                .await
                .map_err(|e| TaskRunnerError::backend_unavailable("redis-queue", e))?;
            let Some((_, bytes)) = result else {
                return Ok(None);
            };
            match serde_json::from_slice::<Task>(&bytes) {
                Ok(task) => return Ok(Some(task)),
                Err(_) => {
                    self.malformed_count
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    tracing::warn!(list_key = %self.list_key, "discarding malformed queue entry");
                    // Discard-and-count per §7; retry against the next
                    // entry, consuming the original deadline rather than
                    // restarting the full timeout each time.
                    continue;
                },
            }
        }
    }

    async fn length(&self) -> Result<usize, TaskRunnerError> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .llen(&self.list_key)
            .await
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-queue", e))?;
        Ok(len)
    }
}
