//! Error types for async tasks.

use std::time::Duration;

use connector_primitives::TaskId;
use connector_tools::ToolError;
use thiserror::Error;

use crate::model::TaskStatus;

/// Errors emitted by the task client and stores.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The URL cannot be scraped.
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl {
        /// Rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
    /// No task with this id exists.
    #[error("task {id} not found")]
    NotFound {
        /// Requested id.
        id: TaskId,
    },
    /// Still pending when the wait budget ran out: nothing picked it up.
    #[error("task {id} was not picked up within {}s; the browser extension is not running", .waited.as_secs())]
    FulfillerNotRunning {
        /// Task id.
        id: TaskId,
        /// How long the client waited.
        waited: Duration,
    },
    /// Picked up but unfinished when the wait budget ran out.
    #[error("task {id} is still {last_status} after {}s", .waited.as_secs())]
    TimedOut {
        /// Task id.
        id: TaskId,
        /// How long the client waited.
        waited: Duration,
        /// Status at the final poll.
        last_status: TaskStatus,
    },
    /// The fulfiller reported a failure.
    #[error("{message}")]
    Failed {
        /// Short failure message.
        message: String,
        /// Human-oriented advice, if the fulfiller supplied one.
        suggestion: Option<String>,
    },
    /// Completed with an empty result.
    #[error("task {id} completed but returned no content")]
    EmptyResult {
        /// Task id.
        id: TaskId,
    },
    /// A lifecycle transition was not permitted.
    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Task id.
        id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
    /// Wait options were inconsistent.
    #[error("invalid wait options: {0}")]
    InvalidWait(&'static str),
    /// The task store failed.
    #[error("task store failure: {reason}")]
    Store {
        /// Human-readable reason.
        reason: String,
    },
}

impl TaskError {
    /// Helper to construct store errors from string-like values.
    #[must_use]
    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store {
            reason: reason.into(),
        }
    }
}

/// Result type alias for task operations.
pub type TaskResult<T> = Result<T, TaskError>;

impl From<TaskError> for ToolError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::InvalidUrl { .. } | TaskError::InvalidWait(_) => {
                Self::invalid_input(err.to_string())
            }
            TaskError::FulfillerNotRunning { .. } => Self::with_suggestion(
                err.to_string(),
                "Ask the user to open their browser with the scraping extension installed and signed in, then try again.",
            ),
            TaskError::TimedOut { id, .. } => Self::with_suggestion(
                err.to_string(),
                format!("Check again later with scrape_status and task_id {id}."),
            ),
            TaskError::Failed {
                message,
                suggestion: Some(suggestion),
            } => Self::with_suggestion(message, suggestion),
            TaskError::Failed {
                message,
                suggestion: None,
            } => Self::execution(message),
            other => Self::execution(other.to_string()),
        }
    }
}
