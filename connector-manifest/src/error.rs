//! Errors raised while loading or validating manifests.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors surfaced by manifest loading and validation.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest document could not be parsed.
    #[error("failed to parse manifest: {source}")]
    Parse {
        /// Underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// A manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest parsed but violates a structural invariant.
    #[error("invalid manifest `{provider}`: {reason}")]
    Invalid {
        /// Provider the manifest describes.
        provider: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// An operation inside the manifest violates a structural invariant.
    #[error("invalid operation `{provider}.{operation}`: {reason}")]
    InvalidOperation {
        /// Provider the manifest describes.
        provider: String,
        /// Offending operation id.
        operation: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}
