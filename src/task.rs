//! The canonical [`Task`] record passed through the queue and the result
//! store, plus the [`TaskStatus`] state machine and the [`ResultRecord`]
//! wrapper the result store persists.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Status of a task as it moves through the system.
///
/// Transitions are monotonic: `Pending -> Running -> {Succeeded, Failed}`.
/// No back-transitions are valid; [`Task::transition`] enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Sitting in the queue, not yet popped by a worker.
    Pending,
    /// Popped by a worker; handler invocation is in progress.
    Running,
    /// Terminal: the handler returned a result.
    Succeeded,
    /// Terminal: the handler failed, timed out, or no handler was registered.
    Failed,
}

impl TaskStatus {
    /// Whether this status is terminal (`Succeeded` or `Failed`).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A unit of work, as it travels through queue, worker, and result store.
///
/// `result` and `error` are mutually exclusive: `result` is set only when
/// `status == Succeeded`, `error` only when `status == Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Opaque unique identifier, assigned at submission.
    pub id: String,

    /// Name of the registered handler this task dispatches to.
    pub kind: String,

    /// Opaque key-value payload passed to the handler.
    pub payload: HashMap<String, Value>,

    /// Current status.
    pub status: TaskStatus,

    /// Present iff `status == Succeeded`.
    pub result: Option<Value>,

    /// Present iff `status == Failed`.
    pub error: Option<String>,

    /// When the task was submitted (submitter's clock).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub submitted_at: DateTime<Utc>,

    /// When a worker popped the task, if it has been popped.
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the task reached a terminal state, if it has.
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new pending task with a generated id.
    ///
    /// `id` is a 128-bit random identifier rendered as 32 hex digits
    /// (`Uuid::new_v4`, simple hyphen-less form), per §4.D.
    ///
    /// # Examples
    ///
    /// ```
    /// use taskrunner::task::{Task, TaskStatus};
    /// use std::collections::HashMap;
    ///
    /// let task = Task::new("square".to_string(), HashMap::new());
    /// assert_eq!(task.status, TaskStatus::Pending);
    /// assert_eq!(task.id.len(), 32);
    /// ```
    pub fn new(kind: String, payload: HashMap<String, Value>) -> Self {
        Self::with_id(Uuid::new_v4().simple().to_string(), kind, payload)
    }

    /// Creates a new pending task with a caller-supplied id.
    pub fn with_id(id: String, kind: String, payload: HashMap<String, Value>) -> Self {
        Self {
            id,
            kind,
            payload,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Marks the task as running. Only valid from `Pending`.
    ///
    /// # Panics
    ///
    /// Panics if called on a task that is not `Pending` -- this is an
    /// internal invariant of the worker runtime, never caller input, so a
    /// violation indicates a bug in the dispatch loop rather than bad data.
    pub fn mark_running(&mut self) {
        assert_eq!(
            self.status,
            TaskStatus::Pending,
            "mark_running called on a task that is not pending"
        );
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Marks the task succeeded with `result`. Only valid from `Running`.
    pub fn mark_succeeded(&mut self, result: Value) {
        assert_eq!(
            self.status,
            TaskStatus::Running,
            "mark_succeeded called on a task that is not running"
        );
        self.status = TaskStatus::Succeeded;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
    }

    /// Marks the task failed with `error`. Only valid from `Running`.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        assert_eq!(
            self.status,
            TaskStatus::Running,
            "mark_failed called on a task that is not running"
        );
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }
}

/// A completed [`Task`] plus the absolute instant it should no longer be
/// retrievable.
///
/// Stored by [`crate::store::ResultStore::put`]; `expires_at` is computed
/// as `finished_at + ttl` at store time, not carried by the `Task` itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    /// The terminal task.
    pub task: Task,

    /// Absolute expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl ResultRecord {
    /// Wraps a terminal task with a TTL, computing `expires_at` from
    /// `task.finished_at` (falling back to now if somehow unset).
    pub fn new(task: Task, ttl: std::time::Duration) -> Self {
        let base = task.finished_at.unwrap_or_else(Utc::now);
        let expires_at = base
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        Self { task, expires_at }
    }

    /// Whether this record is expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether this record is expired as of the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
