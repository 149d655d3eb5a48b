//! Shared error definitions for connector primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the connector hub.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided task identifier could not be parsed.
    #[error("invalid task id: {source}")]
    InvalidTaskId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Provider identifier failed validation.
    #[error("invalid provider id `{id}`: {reason}")]
    InvalidProviderId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// User identifier failed validation.
    #[error("invalid user id: {reason}")]
    InvalidUserId {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
