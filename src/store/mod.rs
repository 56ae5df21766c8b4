//! The [`ResultStore`] capability: a TTL-bound store of terminal task
//! records.
//!
//! Two implementations are provided: [`memory::MemoryResultStore`]
//! (in-process, with a background reaper) and, behind the
//! `redis-backend` feature, [`remote::RedisResultStore`] (TTL delegated
//! to Redis).

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod remote;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TaskRunnerError;
use crate::task::ResultRecord;

/// A TTL-bound key-value store of terminal task records.
///
/// Every operation is individually atomic with respect to other
/// operations on the same `id`. Implementations must be `Send + Sync`.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Stores `record` under `id`, overwriting any prior record, expiring
    /// after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::BackendUnavailable`] if the underlying
    /// transport is down.
    async fn put(&self, id: &str, record: ResultRecord, ttl: Duration) -> Result<(), TaskRunnerError>;

    /// Returns the record for `id`, or `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::BackendUnavailable`] on transport
    /// failure.
    async fn get(&self, id: &str) -> Result<Option<ResultRecord>, TaskRunnerError>;

    /// Removes the record for `id`. Idempotent: deleting an absent id
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::BackendUnavailable`] on transport
    /// failure.
    async fn delete(&self, id: &str) -> Result<(), TaskRunnerError>;

    /// Whether a non-expired record exists for `id`.
    ///
    /// Equivalent to `get(id).is_some()`, but backends may implement this
    /// more cheaply (e.g. Redis `EXISTS` vs a full `GET`).
    async fn exists(&self, id: &str) -> Result<bool, TaskRunnerError> {
        Ok(self.get(id).await?.is_some())
    }
}
