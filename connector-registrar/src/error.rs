//! Registration errors.

use thiserror::Error;

/// Result alias for registration.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Errors that abort a whole registration pass.
///
/// Per-entry failures never surface here; they are recorded in the
/// [`crate::RegistrationReport`] instead.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The capability profile could not be fetched, so nothing can be gated.
    #[error("capability profile unavailable: {reason}")]
    CapabilityUnavailable {
        /// Collaborator-supplied reason.
        reason: String,
    },
}

impl RegistrationError {
    /// Convenience constructor for collaborator failures.
    #[must_use]
    pub fn capability_unavailable(reason: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            reason: reason.into(),
        }
    }
}
