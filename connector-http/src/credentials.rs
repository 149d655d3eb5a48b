//! Credential collaborator.

use std::fmt;

use async_trait::async_trait;
use connector_primitives::{ProviderId, UserId};

use crate::error::ExecutionResult;

/// Secret used to authenticate one call.
///
/// The secret is never printed by `Debug`; executors drop the value once the
/// request is built.
#[derive(Clone)]
pub struct Credential {
    secret: String,
    identity: Option<String>,
}

impl Credential {
    /// Wraps a token or API key.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            identity: None,
        }
    }

    /// Sets a stable, non-secret identity (account id, key fingerprint) used
    /// to key rate-limit buckets.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Returns the raw secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns the non-secret identity, if one was supplied.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Supplies a fresh credential immediately before each call.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns the credential `user` holds for `provider`.
    ///
    /// Implementations should return
    /// [`crate::ExecutionError::CredentialExpired`] when no usable credential
    /// exists.
    async fn credential(&self, provider: &ProviderId, user: &UserId)
    -> ExecutionResult<Credential>;
}
