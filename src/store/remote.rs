//! Redis-backed [`ResultStore`] implementation.
//!
//! [`RedisResultStore`] delegates TTL enforcement to Redis itself (`SET ...
//! EX`), rather than running its own reaper -- the same trade its sibling
//! `RedisQueue` makes by delegating ordering to the server instead of
//! reimplementing it client-side.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::error::TaskRunnerError;
use crate::task::ResultRecord;

use super::ResultStore;

/// Redis-backed result store.
///
/// Keys are `<prefix>:result:<id>`; values are the canonical JSON encoding
/// of [`ResultRecord`].
#[derive(Clone)]
pub struct RedisResultStore {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisResultStore {
    /// Connects to Redis at `url`, keying entries under `<prefix>:result:*`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::BackendUnavailable`] if the client cannot
    /// be created or the connection cannot be established.
    pub async fn new(url: &str, prefix: &str) -> Result<Self, TaskRunnerError> {
        let client = redis::Client::open(url)
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-result-store", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-result-store", e))?;
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, id: &str) -> String {
        format!("{}:result:{id}", self.prefix)
    }
}

#[async_trait]
impl ResultStore for RedisResultStore {
    async fn put(&self, id: &str, record: ResultRecord, ttl: Duration) -> Result<(), TaskRunnerError> {
        let payload = serde_json::to_vec(&record).expect("ResultRecord serialization cannot fail");
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.key(id), payload, ttl_secs)
            .await
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-result-store", e))
    }

    async fn get(&self, id: &str) -> Result<Option<ResultRecord>, TaskRunnerError> {
        let mut conn = self.conn.clone();
        let bytes: Option<Vec<u8>> = conn
            .get(self.key(id))
            .await
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-result-store", e))?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        match serde_json::from_slice::<ResultRecord>(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(_) => {
                tracing::warn!(id, "discarding malformed result entry");
                Err(TaskRunnerError::MalformedEntry {
                    reason: format!("result entry for {id} failed to deserialize"),
                })
            },
        }
    }

    async fn delete(&self, id: &str) -> Result<(), TaskRunnerError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(id))
            .await
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-result-store", e))
    }

    async fn exists(&self, id: &str) -> Result<bool, TaskRunnerError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(self.key(id))
            .await
            .map_err(|e| TaskRunnerError::backend_unavailable("redis-result-store", e))?;
        Ok(exists)
    }
}

#[cfg(all(test, feature = "redis-tests"))]
mod tests {
    use super::*;
    use crate::task::Task;
    use serde_json::json;
    use std::collections::HashMap;

    fn redis_url() -> String {
        std::env::var("TASKRUNNER_TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    fn succeeded_record() -> (String, ResultRecord) {
        let mut task = Task::new("square".to_string(), HashMap::new());
        task.mark_running();
        task.mark_succeeded(json!(49));
        let id = task.id.clone();
        (id, ResultRecord::new(task, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = RedisResultStore::new(&redis_url(), "taskrunner-test-store")
            .await
            .unwrap();
        let (id, record) = succeeded_record();
        store.put(&id, record, Duration::from_secs(60)).await.unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.task.result, Some(json!(49)));
        store.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn ttl_expiry_is_enforced_by_redis() {
        let store = RedisResultStore::new(&redis_url(), "taskrunner-test-store-ttl")
            .await
            .unwrap();
        let (id, record) = succeeded_record();
        store.put(&id, record, Duration::from_secs(1)).await.unwrap();
        assert!(store.exists(&id).await.unwrap());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!store.exists(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = RedisResultStore::new(&redis_url(), "taskrunner-test-store-del")
            .await
            .unwrap();
        let (id, record) = succeeded_record();
        store.put(&id, record, Duration::from_secs(60)).await.unwrap();
        store.delete(&id).await.unwrap();
        store.delete(&id).await.unwrap();
        assert!(!store.exists(&id).await.unwrap());
    }
}
