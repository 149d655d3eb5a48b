//! Classified execution errors.

use std::time::Duration;

use connector_primitives::Access;
use thiserror::Error;

/// Result alias used by the executor.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Broad failure class, used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected before any network call; fix the input, do not retry.
    Precondition,
    /// Credential expired or permission denied; re-authorize.
    Auth,
    /// Provider or local limiter rejected the call; retry later.
    RateLimit,
    /// The addressed record does not exist.
    NotFound,
    /// The provider answered with another error status.
    Upstream,
    /// Network or protocol failure.
    Transport,
    /// The executor or a collaborator is misconfigured.
    Configuration,
}

/// Errors produced while executing a manifest operation.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The manifest has no operation with the requested id.
    #[error("operation `{operation}` is not defined for `{provider}`")]
    UnknownOperation {
        /// Provider the lookup ran against.
        provider: String,
        /// Requested operation id.
        operation: String,
    },

    /// A required parameter or body field was not supplied.
    #[error("missing required argument `{name}`")]
    MissingArgument {
        /// Name of the missing argument.
        name: String,
    },

    /// A supplied argument does not match its declaration.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A path placeholder could not be resolved from the arguments.
    #[error("path placeholder `{{{name}}}` could not be resolved")]
    UnresolvedPlaceholder {
        /// Placeholder name.
        name: String,
    },

    /// The caller's grant does not cover the operation's access class.
    #[error("operation `{operation}` requires {required} access; caller has {}", .granted.map_or("none", Access::as_str))]
    InsufficientAccess {
        /// Operation id.
        operation: String,
        /// Access declared by the operation.
        required: Access,
        /// Access granted to the caller.
        granted: Option<Access>,
    },

    /// The resolved path falls under a manifest blocklist prefix.
    #[error("path `{path}` is blocked for this integration")]
    Blocklisted {
        /// Resolved request path.
        path: String,
    },

    /// The provider rejected the credential (HTTP 401) or none is available.
    #[error("credential for `{provider}` is expired or missing")]
    CredentialExpired {
        /// Provider whose credential failed.
        provider: String,
    },

    /// The credential is valid but lacks permission (HTTP 403).
    #[error("permission denied by `{provider}`: {reason}")]
    PermissionDenied {
        /// Provider that denied the call.
        provider: String,
        /// Provider-supplied detail, truncated.
        reason: String,
    },

    /// Provider (HTTP 429) or local limiter rejected the call.
    #[error("rate limited by `{provider}`{}", .retry_after.map(|d| format!(" (retry after {}s)", d.as_secs().max(1))).unwrap_or_default())]
    RateLimited {
        /// Provider whose limit was hit.
        provider: String,
        /// Suggested delay before retrying.
        retry_after: Option<Duration>,
    },

    /// The addressed resource does not exist (HTTP 404).
    #[error("not found: {path}")]
    NotFound {
        /// Request path.
        path: String,
    },

    /// Any other non-success status.
    #[error("`{provider}` returned HTTP {status}: {reason}")]
    Upstream {
        /// Provider that answered.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Response excerpt.
        reason: String,
    },

    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The executor or a collaborator is misconfigured.
    #[error("executor not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },
}

impl ExecutionError {
    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for argument validation failures.
    #[must_use]
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownOperation { .. }
            | Self::MissingArgument { .. }
            | Self::InvalidArgument { .. }
            | Self::UnresolvedPlaceholder { .. }
            | Self::InsufficientAccess { .. }
            | Self::Blocklisted { .. } => ErrorClass::Precondition,
            Self::CredentialExpired { .. } | Self::PermissionDenied { .. } => ErrorClass::Auth,
            Self::RateLimited { .. } => ErrorClass::RateLimit,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Upstream { .. } => ErrorClass::Upstream,
            Self::Transport { .. } => ErrorClass::Transport,
            Self::Configuration { .. } => ErrorClass::Configuration,
        }
    }

    /// Returns `true` when retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Transport { .. } => true,
            Self::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns an actionable hint for the calling agent, when one applies.
    #[must_use]
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::CredentialExpired { provider } => Some(format!(
                "Ask the user to reconnect their {provider} account, then try again."
            )),
            Self::PermissionDenied { provider, .. } => Some(format!(
                "The connected {provider} account lacks permission for this action; the user may need to grant broader access."
            )),
            Self::RateLimited { .. } => {
                Some("Wait before retrying; do not retry immediately.".to_owned())
            }
            Self::InsufficientAccess { .. } => Some(
                "The user granted read-only access to this integration; ask them to enable write access."
                    .to_owned(),
            ),
            _ => None,
        }
    }
}
