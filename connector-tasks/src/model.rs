//! Scrape task state machine.

use chrono::{DateTime, Utc};
use connector_primitives::TaskId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TaskError, TaskResult};

/// Where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created; no fulfiller has claimed it.
    Pending,
    /// A fulfiller is working on it.
    Processing,
    /// Finished with a result.
    Completed,
    /// Finished without a result.
    Failed,
}

impl TaskStatus {
    /// Returns `true` once no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of externally fulfilled work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeTask {
    id: TaskId,
    url: String,
    status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ScrapeTask {
    /// A fresh pending task.
    #[must_use]
    pub fn pending(url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::random(),
            url: url.into(),
            status: TaskStatus::Pending,
            result: None,
            error_message: None,
            suggestion: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stable identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Page to scrape.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Scraped content; present only when completed.
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Failure message; present only when failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Human-oriented advice accompanying a failure.
    #[must_use]
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last transition.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// `pending -> processing`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidTransition`] from any other state.
    pub fn start(&mut self) -> TaskResult<()> {
        self.transition(TaskStatus::Processing)
    }

    /// `processing -> completed`, storing the result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidTransition`] unless the task is processing.
    pub fn complete(&mut self, result: impl Into<String>) -> TaskResult<()> {
        self.transition(TaskStatus::Completed)?;
        self.result = Some(result.into());
        Ok(())
    }

    /// `pending | processing -> failed`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidTransition`] once the task is terminal.
    pub fn fail(&mut self, message: impl Into<String>, suggestion: Option<String>) -> TaskResult<()> {
        self.transition(TaskStatus::Failed)?;
        self.error_message = Some(message.into());
        self.suggestion = suggestion;
        Ok(())
    }

    fn transition(&mut self, next: TaskStatus) -> TaskResult<()> {
        let allowed = matches!(
            (self.status, next),
            (TaskStatus::Pending, TaskStatus::Processing | TaskStatus::Failed)
                | (TaskStatus::Processing, TaskStatus::Completed | TaskStatus::Failed)
        );
        if !allowed {
            return Err(TaskError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        debug!(task_id = %self.id, from = %self.status, to = %next, "task transition");
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
