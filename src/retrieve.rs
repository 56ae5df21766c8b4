//! Retrieval API: fetch, check, or delete a task's terminal result.

use std::sync::Arc;

use crate::error::TaskRunnerError;
use crate::store::ResultStore;
use crate::task::Task;

/// Returns the terminal task for `id`, or `None` if it has not finished
/// yet, never existed, or has expired.
pub async fn get(store: &Arc<dyn ResultStore>, id: &str) -> Result<Option<Task>, TaskRunnerError> {
    Ok(store.get(id).await?.map(|record| record.task))
}

/// Whether a non-expired result exists for `id`.
pub async fn exists(store: &Arc<dyn ResultStore>, id: &str) -> Result<bool, TaskRunnerError> {
    store.exists(id).await
}

/// Deletes the result for `id`. Idempotent.
pub async fn delete(store: &Arc<dyn ResultStore>, id: &str) -> Result<(), TaskRunnerError> {
    store.delete(id).await
}
