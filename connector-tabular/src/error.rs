//! Error types for tabular stores.

use thiserror::Error;

/// Errors emitted by tabular backends and tab tools.
#[derive(Debug, Error)]
pub enum TabularError {
    /// No tab with this title exists.
    #[error("tab `{title}` does not exist")]
    TabNotFound {
        /// Requested title.
        title: String,
    },
    /// A tab with this title already exists.
    #[error("a tab named `{title}` already exists")]
    DuplicateTab {
        /// Conflicting title.
        title: String,
    },
    /// A tab definition failed validation.
    #[error("invalid tab definition: {reason}")]
    InvalidTab {
        /// What was wrong.
        reason: String,
    },
    /// A write named a column the tab does not have.
    #[error("tab `{title}` has no column `{column}`")]
    UnknownColumn {
        /// Tab title.
        title: String,
        /// Offending column.
        column: String,
    },
    /// The row number is outside the tab's current rows.
    #[error("row {row_number} does not exist in `{title}` ({total} rows)")]
    RowNotFound {
        /// Tab title.
        title: String,
        /// Requested 1-based row number.
        row_number: u64,
        /// Current number of data rows.
        total: u64,
    },
    /// The backing store failed.
    #[error("tabular backend failure: {reason}")]
    Backend {
        /// Human-readable reason.
        reason: String,
    },
}

impl TabularError {
    /// Helper to construct backend errors from string-like values.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    /// Helper to construct tab validation errors.
    #[must_use]
    pub fn invalid_tab(reason: impl Into<String>) -> Self {
        Self::InvalidTab {
            reason: reason.into(),
        }
    }
}

/// Result type alias for tabular operations.
pub type TabularResult<T> = Result<T, TabularError>;

impl From<TabularError> for connector_tools::ToolError {
    fn from(err: TabularError) -> Self {
        match &err {
            TabularError::RowNotFound { .. } => Self::with_suggestion(
                err.to_string(),
                "Row numbers shift after deletions; list the tab to see current row numbers.",
            ),
            TabularError::TabNotFound { .. } => Self::with_suggestion(
                err.to_string(),
                "The tab may have been renamed or deleted; re-register tools to refresh them.",
            ),
            TabularError::InvalidTab { .. } | TabularError::UnknownColumn { .. } => {
                Self::invalid_input(err.to_string())
            }
            TabularError::DuplicateTab { .. } | TabularError::Backend { .. } => {
                Self::execution(err.to_string())
            }
        }
    }
}
