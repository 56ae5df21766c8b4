//! In-process [`ResultStore`] implementation.
//!
//! [`MemoryResultStore`] is a `DashMap` from id to [`ResultRecord`] --
//! the same fine-grained-locking concurrent map the in-memory queue's
//! sibling backends in the reference corpus use for shared state. Reads
//! check `expires_at` lazily so a record is never observably returned
//! past expiry even between reaper sweeps. A background reaper task
//! owns the periodic sweep and is tied to the store's lifecycle: it
//! starts in [`MemoryResultStore::new`] and is aborted when the store is
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::error::TaskRunnerError;
use crate::task::ResultRecord;

use super::ResultStore;

/// Thread-safe in-process result store with TTL-based reclamation.
///
/// # Examples
///
/// ```
/// use taskrunner::store::memory::MemoryResultStore;
/// use std::time::Duration;
///
/// let store = MemoryResultStore::new(Duration::from_secs(60));
/// ```
pub struct MemoryResultStore {
    data: Arc<DashMap<String, ResultRecord>>,
    reaper: Option<JoinHandle<()>>,
}

impl MemoryResultStore {
    /// Creates an empty store and starts its background reaper, which
    /// sweeps for expired records every `reaper_interval`.
    pub fn new(reaper_interval: Duration) -> Self {
        let data: Arc<DashMap<String, ResultRecord>> = Arc::new(DashMap::new());
        let reaper = {
            let data = Arc::clone(&data);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(reaper_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    let now = Utc::now();
                    let before = data.len();
                    data.retain(|_, record| !record.is_expired_at(now));
                    let removed = before - data.len();
                    if removed > 0 {
                        tracing::debug!(removed, "reaper swept expired results");
                    }
                }
            })
        };
        Self {
            data,
            reaper: Some(reaper),
        }
    }

    /// Number of records currently stored, including any that are
    /// expired but not yet reaped. Test/diagnostic use.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Forces an immediate sweep, bypassing the reaper's cadence. Useful
    /// for deterministic tests.
    pub fn sweep_now(&self) -> usize {
        let now = Utc::now();
        let before = self.data.len();
        self.data.retain(|_, record| !record.is_expired_at(now));
        before - self.data.len()
    }
}

impl Default for MemoryResultStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl Drop for MemoryResultStore {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn put(&self, id: &str, record: ResultRecord, _ttl: Duration) -> Result<(), TaskRunnerError> {
        self.data.insert(id.to_string(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ResultRecord>, TaskRunnerError> {
        match self.data.get(id) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.clone())),
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), TaskRunnerError> {
        self.data.remove(id);
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool, TaskRunnerError> {
        Ok(matches!(self.data.get(id), Some(entry) if !entry.is_expired()))
    }
}
