//! Crate-wide error type.
//!
//! [`TaskRunnerError`] covers every failure mode named in the error
//! taxonomy: transient backend faults, malformed queue entries, and the
//! retrieval-side NotFound case. Application-level failures (unknown
//! kind, handler failure, handler timeout) are never surfaced through
//! this type -- they become a terminal [`crate::task::Task`] outcome
//! instead (see [`crate::worker`]).

use std::fmt;

/// Errors that can occur during queue, result-store, or submission
/// operations.
///
/// # Examples
///
/// ```
/// use taskrunner::error::TaskRunnerError;
///
/// let err = TaskRunnerError::NotFound {
///     id: "missing-task".to_string(),
/// };
/// assert!(err.to_string().contains("missing-task"));
/// ```
#[derive(Debug)]
pub enum TaskRunnerError {
    /// The underlying transport (in-process channel, Redis connection) is
    /// down or returned an I/O-level failure.
    BackendUnavailable {
        /// Short description of which backend failed.
        backend: String,
        /// The underlying error, if available.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A queue entry could not be deserialized into a `Task`.
    MalformedEntry {
        /// Description of the parse failure.
        reason: String,
    },

    /// The given id has no record in the result store.
    NotFound {
        /// The id that was not found.
        id: String,
    },

    /// `submit` was called with an empty `kind`.
    InvalidSubmission {
        /// Human-readable description of the validation failure.
        reason: String,
    },

    /// Configuration could not be parsed or resolved.
    Config {
        /// Human-readable description.
        reason: String,
    },
}

impl fmt::Display for TaskRunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendUnavailable { backend, .. } => {
                write!(f, "backend unavailable: {backend}")
            },
            Self::MalformedEntry { reason } => write!(f, "malformed queue entry: {reason}"),
            Self::NotFound { id } => write!(f, "no result for task: {id}"),
            Self::InvalidSubmission { reason } => write!(f, "invalid submission: {reason}"),
            Self::Config { reason } => write!(f, "configuration error: {reason}"),
        }
    }
}

impl std::error::Error for TaskRunnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BackendUnavailable {
                source: Some(src), ..
            } => Some(src.as_ref()),
            _ => None,
        }
    }
}

impl TaskRunnerError {
    /// Constructs a [`TaskRunnerError::BackendUnavailable`] from any
    /// `std::error::Error`, tagging it with the backend's name.
    pub fn backend_unavailable<E>(backend: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BackendUnavailable {
            backend: backend.into(),
            source: Some(Box::new(source)),
        }
    }
}
