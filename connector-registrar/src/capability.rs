//! Capability profile collaborator.

use async_trait::async_trait;
use connector_primitives::{CapabilityProfile, UserId};

use crate::error::RegistrationResult;

/// Supplies a fresh capability profile for a user.
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    /// Fetches the user's current connections.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RegistrationError::CapabilityUnavailable`] when the
    /// connection store cannot be reached.
    async fn capability_profile(&self, user: &UserId) -> RegistrationResult<CapabilityProfile>;
}

/// A fixed profile, handy for single-user deployments and tests.
#[async_trait]
impl CapabilitySource for CapabilityProfile {
    async fn capability_profile(&self, _user: &UserId) -> RegistrationResult<CapabilityProfile> {
        Ok(self.clone())
    }
}
