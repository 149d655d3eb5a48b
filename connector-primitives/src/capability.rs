//! Per-user capability profile supplied by the connection store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Access, AccessLevel, ProviderId};

/// Connection state of one provider for one user.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConnection {
    /// Whether the user has an active connection.
    pub connected: bool,
    /// Optional access level; a connection without one is treated as
    /// [`AccessLevel::ReadWrite`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
}

impl ProviderConnection {
    /// A connected provider with the supplied access level.
    #[must_use]
    pub const fn connected(access_level: AccessLevel) -> Self {
        Self {
            connected: true,
            access_level: Some(access_level),
        }
    }

    /// A provider the user has not connected.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            connected: false,
            access_level: None,
        }
    }

    /// Returns the highest access class this connection grants.
    #[must_use]
    pub fn granted_access(&self) -> Option<Access> {
        if !self.connected {
            return None;
        }
        self.access_level.unwrap_or_default().ceiling()
    }
}

/// Snapshot of which integrations a user has connected.
///
/// Computed fresh per request by an external collaborator and treated as
/// read-only input to registration.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityProfile {
    providers: BTreeMap<ProviderId, ProviderConnection>,
}

impl CapabilityProfile {
    /// Creates an empty profile in which nothing is connected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the connection entry for a provider.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderId, connection: ProviderConnection) -> Self {
        self.providers.insert(provider, connection);
        self
    }

    /// Returns the connection entry for a provider, if the profile lists it.
    #[must_use]
    pub fn connection(&self, provider: &ProviderId) -> Option<&ProviderConnection> {
        self.providers.get(provider)
    }

    /// Returns `true` when the provider is listed and connected.
    #[must_use]
    pub fn is_connected(&self, provider: &ProviderId) -> bool {
        self.connection(provider).is_some_and(|c| c.connected)
    }

    /// Returns the highest access class granted for a provider.
    #[must_use]
    pub fn granted_access(&self, provider: &ProviderId) -> Option<Access> {
        self.connection(provider)
            .and_then(ProviderConnection::granted_access)
    }

    /// Iterates providers in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProviderId, &ProviderConnection)> {
        self.providers.iter()
    }
}
