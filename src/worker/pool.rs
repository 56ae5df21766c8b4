//! The worker pool: a fixed number of executors that pop tasks from a
//! [`Queue`], dispatch them to a registered [`Handler`], and publish
//! terminal results to a [`ResultStore`].
//!
//! Grounded in the same shape as a Postgres-backed task queue worker
//! pool: a poll loop per worker, an execution deadline via
//! `tokio::time::timeout`, and bounded exponential backoff on result
//! publication failures. Unlike that reference, each worker here owns
//! its own poll loop directly (no semaphore) since `Queue::pop` already
//! blocks, and unlike it, handler invocation is spawned onto its own
//! task so a panicking handler fails only that task, not the worker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::Config;
use crate::queue::Queue;
use crate::store::ResultStore;
use crate::task::{ResultRecord, Task};

use super::handler::HandlerRegistry;

/// A running pool of task executors.
///
/// Dropping a `WorkerPool` without calling [`WorkerPool::shutdown`] aborts
/// all worker loops immediately, abandoning any task mid-execution.
pub struct WorkerPool {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
    lost_results: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Spawns `config.api_workers` executors, each polling `queue`
    /// independently.
    pub fn spawn(
        queue: Arc<dyn Queue>,
        store: Arc<dyn ResultStore>,
        registry: Arc<HandlerRegistry>,
        config: Config,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let lost_results = Arc::new(AtomicU64::new(0));
        let poll_timeout = Duration::from_millis(config.poll_timeout_ms);
        let worker_count = config.api_workers.max(1);

        tracing::info!(worker_count, poll_timeout_ms = config.poll_timeout_ms, "worker pool starting");

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let store = Arc::clone(&store);
            let registry = Arc::clone(&registry);
            let config = config.clone();
            let shutdown = Arc::clone(&shutdown);
            let lost_results = Arc::clone(&lost_results);
            handles.push(tokio::spawn(Self::run(
                worker_id,
                queue,
                store,
                registry,
                config,
                poll_timeout,
                shutdown,
                lost_results,
            )));
        }

        Self {
            shutdown,
            handles,
            lost_results,
        }
    }

    /// Number of terminal results dropped after `publish_max_attempts`
    /// exhausted retries against the result store.
    pub fn lost_results(&self) -> u64 {
        self.lost_results.load(Ordering::Relaxed)
    }

    /// Signals all workers to stop claiming new tasks, then waits up to
    /// `grace` for in-flight tasks to finish before aborting stragglers.
    pub async fn shutdown(self, grace: Duration) {
        self.shutdown.store(true, Ordering::Relaxed);
        let deadline = Instant::now() + grace;
        for mut handle in self.handles {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                handle.abort();
                continue;
            }
            if tokio::time::timeout(remaining, &mut handle).await.is_err() {
                tracing::warn!("worker did not stop within grace period, aborting");
                handle.abort();
            }
        }
    }

    async fn run(
        worker_id: usize,
        queue: Arc<dyn Queue>,
        store: Arc<dyn ResultStore>,
        registry: Arc<HandlerRegistry>,
        config: Config,
        poll_timeout: Duration,
        shutdown: Arc<AtomicBool>,
        lost_results: Arc<AtomicU64>,
    ) {
        tracing::info!(worker_id, "worker started");
        while !shutdown.load(Ordering::Relaxed) {
            match queue.pop(poll_timeout).await {
                Ok(Some(task)) => {
                    Self::execute(worker_id, task, &store, &registry, &config, &lost_results).await;
                },
                Ok(None) => {},
                Err(error) => {
                    tracing::error!(worker_id, %error, "queue poll failed, backing off");
                    tokio::time::sleep(poll_timeout.min(Duration::from_secs(1))).await;
                },
            }
        }
        tracing::info!(worker_id, "worker stopped");
    }

    #[tracing::instrument(skip(task, store, registry, config, lost_results), fields(task_id = %task.id, kind = %task.kind))]
    async fn execute(
        worker_id: usize,
        mut task: Task,
        store: &Arc<dyn ResultStore>,
        registry: &Arc<HandlerRegistry>,
        config: &Config,
        lost_results: &Arc<AtomicU64>,
    ) {
        task.mark_running();
        let id = task.id.clone();
        let kind = task.kind.clone();
        tracing::info!(worker_id, task_id = %id, kind = %kind, "task started");

        let outcome = Self::invoke_handler(registry, &task, config).await;

        match outcome {
            Ok(value) => task.mark_succeeded(value),
            Err(reason) => {
                tracing::warn!(worker_id, task_id = %id, error = %reason, "task failed");
                task.mark_failed(reason);
            },
        }

        Self::publish_with_retry(&id, task, store, config, lost_results).await;
    }

    async fn invoke_handler(
        registry: &Arc<HandlerRegistry>,
        task: &Task,
        config: &Config,
    ) -> Result<Value, String> {
        let Some(handler) = registry.get(&task.kind) else {
            return Err(format!("no handler registered for kind '{}'", task.kind));
        };

        let payload = task.payload.clone();
        let spawned = tokio::spawn(async move { handler.call(payload).await });

        match config.execution_deadline_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), spawned).await {
                Ok(Ok(Ok(value))) => Ok(value),
                Ok(Ok(Err(reason))) => Err(reason),
                Ok(Err(join_error)) => Err(format!("handler panicked: {join_error}")),
                Err(_) => Err(format!("handler exceeded execution deadline of {ms}ms")),
            },
            None => match spawned.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(reason)) => Err(reason),
                Err(join_error) => Err(format!("handler panicked: {join_error}")),
            },
        }
    }

    async fn publish_with_retry(
        id: &str,
        task: Task,
        store: &Arc<dyn ResultStore>,
        config: &Config,
        lost_results: &Arc<AtomicU64>,
    ) {
        let record = ResultRecord::new(task, Duration::from_secs(config.result_store_ttl_secs));
        let mut attempt = 0u32;
        let mut backoff = Duration::from_millis(config.publish_backoff_initial_ms);

        loop {
            attempt += 1;
            let ttl = Duration::from_secs(config.result_store_ttl_secs);
            match store.put(id, record.clone(), ttl).await {
                Ok(()) => return,
                Err(error) if attempt >= config.publish_max_attempts => {
                    tracing::error!(
                        task_id = id,
                        attempt,
                        %error,
                        "giving up publishing result after max attempts"
                    );
                    lost_results.fetch_add(1, Ordering::Relaxed);
                    return;
                },
                Err(error) => {
                    tracing::warn!(
                        task_id = id,
                        attempt,
                        %error,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying result publish"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_millis(config.publish_backoff_cap_ms));
                },
            }
        }
    }
}
