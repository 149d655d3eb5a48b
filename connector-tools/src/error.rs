//! Errors produced by tool registration and invocation.

use thiserror::Error;

use crate::registry::ToolOutput;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors produced by tool registration and invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool metadata failed validation.
    #[error("invalid tool metadata: {reason}")]
    InvalidMetadata {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool name collided with an existing registration.
    #[error("tool `{name}` is already registered")]
    DuplicateTool {
        /// Name of the offending tool.
        name: String,
    },

    /// Requested tool does not exist.
    #[error("tool `{name}` is not registered")]
    UnknownTool {
        /// Name of the missing tool.
        name: String,
    },

    /// The caller supplied input the tool cannot accept.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// Tool execution failed.
    #[error("{reason}")]
    Execution {
        /// Short message returned by the tool implementation.
        reason: String,
        /// What the caller can do about it, if anything.
        suggestion: Option<String>,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
            suggestion: None,
        }
    }

    /// Creates an execution error that carries a suggestion for the caller.
    #[must_use]
    pub fn with_suggestion(reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Creates an invalid-input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Renders the error as a flagged tool output.
    #[must_use]
    pub fn to_output(&self) -> ToolOutput {
        match self {
            Self::Execution {
                reason,
                suggestion: Some(suggestion),
            } => ToolOutput::error(format!("{reason}\nSuggestion: {suggestion}")),
            other => ToolOutput::error(other.to_string()),
        }
    }
}
