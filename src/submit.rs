//! Submission API: validate and enqueue a task.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::TaskRunnerError;
use crate::queue::Queue;
use crate::task::Task;

/// Validates and enqueues a new task, returning its generated id.
///
/// # Errors
///
/// Returns [`TaskRunnerError::InvalidSubmission`] if `kind` is empty, or
/// [`TaskRunnerError::BackendUnavailable`] if the queue cannot accept the
/// push.
///
/// # Examples
///
/// ```
/// use taskrunner::queue::memory::MemoryQueue;
/// use taskrunner::submit;
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let queue = Arc::new(MemoryQueue::new());
/// let id = submit::submit(&queue, "square".to_string(), HashMap::new()).await.unwrap();
/// assert_eq!(id.len(), 32);
/// # }
/// ```
pub async fn submit(
    queue: &Arc<dyn Queue>,
    kind: String,
    payload: HashMap<String, Value>,
) -> Result<String, TaskRunnerError> {
    if kind.trim().is_empty() {
        return Err(TaskRunnerError::InvalidSubmission {
            reason: "kind must not be empty".to_string(),
        });
    }

    let task = Task::new(kind, payload);
    let id = task.id.clone();
    queue.push(task).await?;
    tracing::info!(task_id = %id, "task submitted");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::memory::MemoryQueue;
    use std::time::Duration;

    #[tokio::test]
    async fn submit_enqueues_a_pending_task() {
        let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new());
        let id = submit(&queue, "square".to_string(), HashMap::new()).await.unwrap();
        assert_eq!(id.len(), 32);

        let popped = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(popped.id, id);
        assert_eq!(popped.kind, "square");
    }

    #[tokio::test]
    async fn submit_rejects_empty_kind() {
        let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new());
        let err = submit(&queue, "   ".to_string(), HashMap::new()).await.unwrap_err();
        assert!(matches!(err, TaskRunnerError::InvalidSubmission { .. }));
    }
}
